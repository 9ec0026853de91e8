// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core trait for acquisition file I/O.
//!
//! Every format handler implements [`AcquisitionFileIo`] so that a factory
//! can pick a handler by probing a path without knowing format details.

use std::path::Path;

use crate::{Acquisition, Result};

/// Read/write contract shared by acquisition file formats.
///
/// # Example
///
/// ```no_run
/// use c3dcodec::io::traits::AcquisitionFileIo;
/// use c3dcodec::Acquisition;
///
/// fn load(io: &mut dyn AcquisitionFileIo, path: &str) -> c3dcodec::Result<Acquisition> {
///     let mut acq = Acquisition::new();
///     io.read(path.as_ref(), &mut acq)?;
///     Ok(acq)
/// }
/// ```
pub trait AcquisitionFileIo {
    /// Cheap check whether `path` looks readable by this handler.
    ///
    /// Only the first bytes of the file are inspected; a `true` answer does
    /// not guarantee that [`read`](Self::read) succeeds.
    fn can_read(&self, path: &Path) -> bool;

    /// Whether this handler writes files with the extension of `path`.
    fn can_write(&self, path: &Path) -> bool;

    /// Replace the content of `acq` with the acquisition stored at `path`.
    fn read(&mut self, path: &Path, acq: &mut Acquisition) -> Result<()>;

    /// Store `acq` at `path`.
    ///
    /// The destination is left untouched when encoding fails.
    fn write(&mut self, path: &Path, acq: &Acquisition) -> Result<()>;
}
