// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Rewrite command - read a C3D file and write it with another configuration.

use std::path::PathBuf;

use clap::Args;

use crate::common::{open_acquisition, Result};
use c3dcodec::{AcquisitionFileIo, ByteOrder, StorageFormat, WriterFlags};

/// Read a file then write it back, optionally changing its encoding.
#[derive(Args, Clone, Debug)]
pub struct RewriteCmd {
    /// Input C3D file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output C3D file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Output byte order (vax-le, ieee-le, ieee-be); defaults to the input's
    #[arg(long)]
    byte_order: Option<ByteOrder>,

    /// Output sample storage (integer, float); defaults to the input's
    #[arg(long)]
    storage: Option<StorageFormat>,

    /// Write the metadata and scales of the input as they are
    #[arg(long)]
    no_sync: bool,

    /// Keep the output readable by Vicon Workstation
    #[arg(long)]
    vicon: bool,
}

impl RewriteCmd {
    pub fn run(self) -> Result<()> {
        println!("Rewriting C3D file:");
        println!("  Input:  {}", self.input.display());
        println!("  Output: {}", self.output.display());

        let (mut io, acq) = open_acquisition(&self.input)?;
        println!(
            "  Points: {}, analog channels: {}, frames: {}",
            acq.points.len(),
            acq.analogs.len(),
            acq.frame_count()
        );

        let state = io.state_mut();
        if let Some(order) = self.byte_order {
            state.byte_order = order;
        }
        if let Some(storage) = self.storage {
            state.storage_format = storage;
        }
        if self.no_sync {
            state.writer_flags = WriterFlags::empty();
        }
        if self.vicon {
            state.writer_flags |= WriterFlags::VICON_COMPATIBLE;
        }

        io.write(&self.output, &acq)?;

        let state = io.state();
        println!(
            "  Written as {} / {} (point scale {})",
            state.byte_order.as_str(),
            state.storage_format.as_str(),
            state.point_scale
        );
        Ok(())
    }
}
