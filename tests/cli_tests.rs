// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI integration tests.
//!
//! These tests run the actual c3dtool binary and verify its behavior.

mod common;

use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use c3dcodec::encoding::ByteOrder;
use c3dcodec::{Acquisition, AcquisitionFileIo, C3dFormat, StorageFormat};
use common::synthetic_acquisition;

/// Get the path to the built c3dtool binary
fn c3dtool_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_c3dtool"))
}

/// Write a small synthetic acquisition to `dir`.
fn write_fixture(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let acq = synthetic_acquisition(3, 20, 2, 2);
    C3dFormat::new().write(&path, &acq).unwrap();
    path
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Run c3dtool with arguments
fn run(args: &[&str]) -> Output {
    let bin = c3dtool_bin();
    Command::new(&bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|_| panic!("Failed to run {:?}", bin))
}

/// Run c3dtool and assert success
fn run_ok(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        output.status.success(),
        "Command failed: {:?}\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run c3dtool and assert failure
fn run_err(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        !output.status.success(),
        "Command should have failed but succeeded: {:?}",
        args
    );
    String::from_utf8_lossy(&output.stderr).to_string()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_help() {
    let output = run_ok(&["--help"]);
    assert!(output.contains("C3D motion capture file toolkit"));
    assert!(output.contains("inspect"));
    assert!(output.contains("rewrite"));
}

#[test]
fn test_cli_version() {
    let output = run_ok(&["--version"]);
    assert!(output.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_no_args() {
    let output = run(&[]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_invalid_subcommand() {
    run_err(&["explode"]);
}

// ============================================================================
// Inspect Command Tests
// ============================================================================

#[test]
fn test_inspect_info() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "walk.c3d");

    let output = run_ok(&["inspect", "info", &path_str(&path)]);
    assert!(output.contains("Byte order: ieee-le"));
    assert!(output.contains("Storage: integer"));
    assert!(output.contains("Points: 3"));
    assert!(output.contains("Analog channels: 2"));
    assert!(output.contains("M00"));
    assert!(output.contains("CH2"));
    assert!(output.contains("Foot Strike"));
}

#[test]
fn test_inspect_metadata_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "walk.c3d");

    let output = run_ok(&["inspect", "metadata", &path_str(&path)]);
    assert!(output.contains("POINT"));
    assert!(output.contains("ANALOG"));
    assert!(output.contains("LABELS"));
}

#[test]
fn test_inspect_metadata_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "walk.c3d");

    let output = run_ok(&["inspect", "metadata", "--json", &path_str(&path)]);
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert!(parsed.is_object());
    assert!(output.contains("\"POINT\""));
}

#[test]
fn test_inspect_info_nonexistent_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.c3d");

    let stderr = run_err(&["inspect", "info", &path_str(&missing)]);
    assert!(stderr.contains("Error"));
}

#[test]
fn test_inspect_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.c3d");
    std::fs::write(&path, vec![0xAB; 1024]).unwrap();

    let stderr = run_err(&["inspect", "info", &path_str(&path)]);
    assert!(stderr.contains("Error"));
}

// ============================================================================
// Rewrite Command Tests
// ============================================================================

#[test]
fn test_rewrite_help() {
    let output = run_ok(&["rewrite", "--help"]);
    assert!(output.contains("--byte-order"));
    assert!(output.contains("--storage"));
}

#[test]
fn test_rewrite_changes_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "walk.c3d");
    let output_path = dir.path().join("walk_be.c3d");

    let output = run_ok(&[
        "rewrite",
        &path_str(&input),
        &path_str(&output_path),
        "--byte-order",
        "ieee-be",
        "--storage",
        "float",
    ]);
    assert!(output.contains("ieee-be"));

    let mut io = C3dFormat::new();
    let mut acq = Acquisition::new();
    io.read(&output_path, &mut acq).unwrap();
    assert_eq!(io.state().byte_order, ByteOrder::IeeeBigEndian);
    assert_eq!(io.state().storage_format, StorageFormat::Float);
    assert_eq!(acq.points.len(), 3);
    assert_eq!(acq.analogs.len(), 2);
    assert_eq!(acq.frame_count(), 20);
}

#[test]
fn test_rewrite_invalid_byte_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(dir.path(), "walk.c3d");
    let output_path = dir.path().join("out.c3d");

    run_err(&[
        "rewrite",
        &path_str(&input),
        &path_str(&output_path),
        "--byte-order",
        "middle-endian",
    ]);
    assert!(!output_path.exists());
}

#[test]
fn test_rewrite_nonexistent_input() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.c3d");

    run_err(&[
        "rewrite",
        &path_str(&dir.path().join("missing.c3d")),
        &path_str(&output_path),
    ]);
    assert!(!output_path.exists());
}
