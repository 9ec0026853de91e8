// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for acquisition file formats.
//!
//! This module provides format detection, the shared file I/O contract
//! and the format implementations.

pub mod detection;
pub mod formats;

// Re-exports
pub use detection::{detect_format, has_c3d_extension, is_c3d_file, FileFormat, FormatDetector};

// Trait implemented by every format handler
pub mod traits;
pub use traits::AcquisitionFileIo;
