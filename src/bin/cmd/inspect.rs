// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Inspect command - show file information and the parameter tree.

use std::path::PathBuf;

use clap::Subcommand;

use crate::common::{format_duration, format_value, open_acquisition, Result};
use c3dcodec::MetadataNode;

/// Inspect file contents.
#[derive(Subcommand, Clone, Debug)]
pub enum InspectCmd {
    /// Show basic file information and summary
    Info {
        /// Input C3D file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Dump the group/parameter tree
    Metadata {
        /// Input C3D file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
}

impl InspectCmd {
    pub fn run(self) -> Result<()> {
        match self {
            InspectCmd::Info { input } => cmd_info(input),
            InspectCmd::Metadata { input, json } => cmd_metadata(input, json),
        }
    }
}

/// Cmd: Show file info
fn cmd_info(input: PathBuf) -> Result<()> {
    let (io, acq) = open_acquisition(&input)?;
    let state = io.state();

    println!("=== {} ===", input.display());
    println!("Byte order: {}", state.byte_order.as_str());
    println!("Storage: {}", state.storage_format.as_str());
    println!("Analog format: {}", state.analog_format.as_parameter());
    println!("Point scale: {}", state.point_scale);
    println!("Points: {}", acq.points.len());
    println!("Analog channels: {}", acq.analogs.len());
    println!("Analog samples per frame: {}", acq.analog_samples_per_frame);
    println!("Analog resolution: {} bits", acq.analog_resolution);
    println!(
        "Frames: {} ({}..{})",
        acq.frame_count(),
        acq.first_frame,
        acq.last_frame()
    );
    println!("Point rate: {} Hz", acq.point_frequency);
    if !acq.analogs.is_empty() {
        println!("Analog rate: {} Hz", acq.analog_frequency());
    }
    println!("Duration: {}", format_duration(acq.duration()));

    if !acq.points.is_empty() {
        println!();
        println!("Points:");
        for point in &acq.points {
            let valid = (0..point.frame_count())
                .filter(|&f| point.is_valid(f))
                .count();
            println!(
                "  {} | {} | {}/{} valid frames",
                point.label,
                point.point_type.as_str(),
                valid,
                point.frame_count()
            );
        }
    }

    if !acq.analogs.is_empty() {
        println!();
        println!("Analog channels:");
        for analog in &acq.analogs {
            println!(
                "  {} | {} | scale {} | offset {}",
                analog.label, analog.unit, analog.scale, analog.offset
            );
        }
    }

    if !acq.events.is_empty() {
        println!();
        println!("Events:");
        for event in &acq.events {
            println!(
                "  {:.3}s {} [{}] {}",
                event.time, event.label, event.context, event.subject
            );
        }
    }

    Ok(())
}

/// Cmd: Dump metadata
fn cmd_metadata(input: PathBuf, json: bool) -> Result<()> {
    let (_, acq) = open_acquisition(&input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&acq.metadata)?);
        return Ok(());
    }

    println!("=== Metadata of {} ===", input.display());
    for group in acq.metadata.children() {
        print_group(group);
    }
    Ok(())
}

fn print_group(group: &MetadataNode) {
    println!();
    print!("{}", group.label);
    if !group.description.is_empty() {
        print!(" - {}", group.description);
    }
    println!();

    for parameter in group.children() {
        let Some(value) = &parameter.value else {
            continue;
        };
        let lock = if parameter.locked { " (locked)" } else { "" };
        println!(
            "  {}{} {:?} {:?} = {}",
            parameter.label,
            lock,
            value.kind(),
            value.dims(),
            format_value(value)
        );
    }
}
