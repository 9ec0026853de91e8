// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Format detection using the C3D header key and file extension.
//!
//! A C3D file starts with the block number of its parameter section and
//! the key byte `0x50`. The parameter section itself repeats the key and
//! carries the processor type, so a probe reads at most two small slices
//! of the file and never parses it.
//!
//! # Example
//!
//! ```rust,no_run
//! use c3dcodec::io::detection::{detect_format, FileFormat};
//!
//! let format = detect_format("walk.c3d")?;
//! assert_eq!(format, FileFormat::C3d);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::encoding::ByteOrder;
use crate::CodecError;

use super::formats::c3d::constants::{
    block_offset, HEADER_KEY, OFF_KEY, OFF_PARAMETER_BLOCK, OFF_SECTION_PROCESSOR,
};

/// Detected file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// C3D motion capture file
    C3d,
    /// Unknown format
    Unknown,
}

impl FileFormat {
    /// Get the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::C3d => "c3d",
            FileFormat::Unknown => "",
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::C3d => write!(f, "C3D"),
            FileFormat::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Try to detect the file format from the file content.
///
/// The header key is checked first; files that cannot be opened or do not
/// carry the key fall back to the extension.
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<FileFormat, CodecError> {
    let path_ref = path.as_ref();
    if let Ok(true) = probe_header_key(path_ref) {
        return Ok(FileFormat::C3d);
    }
    Ok(detect_from_extension(path_ref))
}

/// Check whether a file carries the C3D header key and a known processor
/// type.
pub fn is_c3d_file<P: AsRef<Path>>(path: P) -> bool {
    probe_header_key(path.as_ref()).unwrap_or(false)
}

/// Check whether a path has the `.c3d` extension (case-insensitive).
pub fn has_c3d_extension<P: AsRef<Path>>(path: P) -> bool {
    detect_from_extension(path.as_ref()) == FileFormat::C3d
}

/// Check the key byte and the processor-type byte of the parameter section.
fn probe_header_key(path: &Path) -> Result<bool, CodecError> {
    let mut file = File::open(path)?;
    let mut head = [0u8; 2];
    if file.read_exact(&mut head).is_err() {
        return Ok(false);
    }
    let first_block = usize::from(head[OFF_PARAMETER_BLOCK]);
    if first_block == 0 || head[OFF_KEY] != HEADER_KEY {
        return Ok(false);
    }

    let mut section = [0u8; 4];
    file.seek(SeekFrom::Start(block_offset(first_block) as u64))?;
    if file.read_exact(&mut section).is_err() {
        return Ok(false);
    }
    Ok(ByteOrder::from_processor_type(section[OFF_SECTION_PROCESSOR] as i8).is_some())
}

/// Detect format from file extension (fallback).
fn detect_from_extension(path: &Path) -> FileFormat {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| match ext.to_lowercase().as_str() {
            "c3d" => FileFormat::C3d,
            _ => FileFormat::Unknown,
        })
        .unwrap_or(FileFormat::Unknown)
}

/// Pluggable format detection.
pub trait FormatDetector: Send + Sync {
    /// Detect the format of a file.
    fn detect(&self, path: &Path) -> Result<FileFormat, CodecError>;
}

/// Default format detector implementation.
#[derive(Debug, Clone, Copy)]
pub struct DefaultFormatDetector;

impl FormatDetector for DefaultFormatDetector {
    fn detect(&self, path: &Path) -> Result<FileFormat, CodecError> {
        detect_format(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_temp_file(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    fn minimal_c3d(processor: u8) -> Vec<u8> {
        let mut data = vec![0u8; 1024];
        data[0] = 2;
        data[1] = HEADER_KEY;
        data[512 + 1] = HEADER_KEY;
        data[512 + 2] = 1;
        data[512 + 3] = processor;
        data
    }

    #[test]
    fn test_detect_from_header_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_temp_file(&dir, "trial.bin", &minimal_c3d(84));

        assert_eq!(detect_format(&path).unwrap(), FileFormat::C3d);
        assert!(is_c3d_file(&path));
    }

    #[test]
    fn test_unbiased_processor_type_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_temp_file(&dir, "raw.bin", &minimal_c3d(3));

        assert!(is_c3d_file(&path));
    }

    #[test]
    fn test_bad_processor_type_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_temp_file(&dir, "bad.bin", &minimal_c3d(90));

        assert!(!is_c3d_file(&path));
        assert_eq!(detect_format(&path).unwrap(), FileFormat::Unknown);
    }

    #[test]
    fn test_detect_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_temp_file(&dir, "dummy.C3D", b"dummy content");

        assert!(!is_c3d_file(&path));
        assert!(has_c3d_extension(&path));
        assert_eq!(detect_format(&path).unwrap(), FileFormat::C3d);
    }

    #[test]
    fn test_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_temp_file(&dir, "unknown.xyz", b"unknown content");

        assert_eq!(detect_format(&path).unwrap(), FileFormat::Unknown);
        assert_eq!(FileFormat::Unknown.extension(), "");
    }

    #[test]
    fn test_missing_file_falls_back_to_extension() {
        assert_eq!(
            detect_format("/nonexistent/trial.c3d").unwrap(),
            FileFormat::C3d
        );
        assert!(!is_c3d_file("/nonexistent/trial.c3d"));
    }

    #[test]
    fn test_format_detector_trait() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_temp_file(&dir, "detector.dat", &minimal_c3d(86));

        let format = DefaultFormatDetector.detect(&path).unwrap();
        assert_eq!(format, FileFormat::C3d);
        assert_eq!(format.to_string(), "C3D");
    }
}
