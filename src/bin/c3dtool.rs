// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # c3dtool CLI
//!
//! Command-line tool for C3D motion capture files.
//!
//! ## Usage
//!
//! ```sh
//! # Show file information
//! c3dtool inspect info walk.c3d
//!
//! # Dump the parameter tree
//! c3dtool inspect metadata walk.c3d --json
//!
//! # Rewrite as big-endian floating-point data
//! c3dtool rewrite walk.c3d walk_be.c3d --byte-order ieee-be --storage float
//! ```

mod cmd;
mod common;

use std::process;

use clap::{Parser, Subcommand};
use cmd::{InspectCmd, RewriteCmd};
use common::Result;

/// c3dtool - C3D motion capture file toolkit
///
/// Inspect and rewrite C3D files written by any processor type.
#[derive(Parser, Clone)]
#[command(name = "c3dtool")]
#[command(about = "C3D motion capture file toolkit", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Log layout decisions (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Inspect file contents (info, metadata)
    #[command(subcommand)]
    Inspect(InspectCmd),

    /// Read a file and write it back with another configuration
    Rewrite(RewriteCmd),
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    common::init_logging(cli.verbose);

    match cli.command {
        Commands::Inspect(cmd) => cmd.run(),
        Commands::Rewrite(cmd) => cmd.run(),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
