// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D format implementation.
//!
//! This module provides a complete C3D reader/writer with:
//! - IEEE little/big-endian and VAX processor types
//! - Integer and floating-point sample storage, signed or unsigned analogs
//! - Files with or without a header block
//! - Metadata synchronization before writing, with an optional Vicon
//!   Workstation compatibility pass
//!
//! Reading memory-maps the file; writing builds the whole file in memory
//! and stores it with one call.

pub use constants::{BLOCK_SIZE, HEADER_KEY};

// Block layout and header offsets
pub mod constants;

pub mod header;
pub mod parameters;
pub mod samples;
pub mod state;

// Decode/encode pipelines
pub mod reader;
pub mod sync;
pub mod writer;

pub use header::{C3dHeader, HeaderEvent};
pub use reader::read_acquisition;
pub use samples::{SampleCodec, SampleScaling};
pub use state::{AnalogFormat, CodecState, StorageFormat, WriterFlags};
pub use sync::{synchronize, WritePlan};
pub use writer::write_acquisition;

use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::encoding::ByteOrder;
use crate::io::detection::{has_c3d_extension, is_c3d_file};
use crate::io::traits::AcquisitionFileIo;
use crate::{Acquisition, CodecError, Result};

/// C3D file handler.
///
/// The handler keeps the [`CodecState`] of the last read so that a
/// following write reuses the byte order, storage format and scales of
/// the source file.
///
/// # Example
///
/// ```no_run
/// use c3dcodec::{Acquisition, AcquisitionFileIo, C3dFormat};
///
/// let mut io = C3dFormat::new();
/// let mut acq = Acquisition::new();
/// io.read("walk.c3d".as_ref(), &mut acq)?;
/// println!("{} points at {} Hz", acq.points.len(), acq.point_frequency);
/// io.write("walk_copy.c3d".as_ref(), &acq)?;
/// # Ok::<(), c3dcodec::CodecError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct C3dFormat {
    state: CodecState,
}

impl C3dFormat {
    /// Create a handler with the default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handler around an existing state.
    pub fn with_state(state: CodecState) -> Self {
        Self { state }
    }

    /// Start building a configured handler.
    pub fn builder() -> C3dFormatBuilder {
        C3dFormatBuilder::new()
    }

    /// State of the last read or write.
    pub fn state(&self) -> &CodecState {
        &self.state
    }

    /// Mutable access to the state, to adjust it between a read and a write.
    pub fn state_mut(&mut self) -> &mut CodecState {
        &mut self.state
    }

    /// Decode a C3D file held in memory.
    pub fn read_bytes(&mut self, data: &[u8], acq: &mut Acquisition) -> Result<()> {
        if data.is_empty() {
            return Err(CodecError::truncated(2, 0, 0));
        }
        read_acquisition(data, &mut self.state, acq)
    }

    /// Encode `acq` into the bytes of a C3D file.
    pub fn write_bytes(&mut self, acq: &Acquisition) -> Result<Vec<u8>> {
        write_acquisition(acq, &mut self.state)
    }
}

impl AcquisitionFileIo for C3dFormat {
    fn can_read(&self, path: &Path) -> bool {
        is_c3d_file(path)
    }

    fn can_write(&self, path: &Path) -> bool {
        has_c3d_extension(path)
    }

    fn read(&mut self, path: &Path, acq: &mut Acquisition) -> Result<()> {
        let file = File::open(path)
            .map_err(|e| CodecError::io(format!("Failed to open {}: {e}", path.display())))?;
        let file_size = file.metadata()?.len();
        if file_size == 0 {
            return Err(CodecError::truncated(2, 0, 0));
        }

        // SAFETY: the map is read-only and dropped before returning.
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| CodecError::io(format!("Failed to mmap {}: {e}", path.display())))?;
        self.read_bytes(&mmap, acq)?;

        debug!(
            file = %path.display(),
            points = acq.points.len(),
            analogs = acq.analogs.len(),
            frames = acq.frame_count(),
            "C3D file read"
        );
        Ok(())
    }

    fn write(&mut self, path: &Path, acq: &Acquisition) -> Result<()> {
        let bytes = self.write_bytes(acq)?;
        std::fs::write(path, &bytes)
            .map_err(|e| CodecError::io(format!("Failed to write {}: {e}", path.display())))?;
        debug!(file = %path.display(), bytes = bytes.len(), "C3D file written");
        Ok(())
    }
}

/// Builder for a configured [`C3dFormat`].
#[derive(Debug, Clone, Default)]
pub struct C3dFormatBuilder {
    state: CodecState,
}

impl C3dFormatBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the byte order used when writing.
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.state.byte_order = order;
        self
    }

    /// Set the sample storage format used when writing.
    pub fn storage_format(mut self, format: StorageFormat) -> Self {
        self.state.storage_format = format;
        self
    }

    /// Set the signedness of integer analog samples.
    pub fn analog_format(mut self, format: AnalogFormat) -> Self {
        self.state.analog_format = format;
        self
    }

    /// Set the synchronization passes run before a write.
    pub fn writer_flags(mut self, flags: WriterFlags) -> Self {
        self.state.writer_flags = flags;
        self
    }

    /// Build the handler.
    pub fn build(self) -> C3dFormat {
        C3dFormat::with_state(self.state)
    }
}
