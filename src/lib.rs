// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # c3dcodec
//!
//! Codec library for C3D motion capture files.
//!
//! This library reads and writes C3D files into an in-memory acquisition:
//! - **Header** decoding and encoding in [`io::formats::c3d::header`](crate::io::formats::c3d::header)
//! - **Parameter section** as a group/parameter tree in [`core::metadata`](crate::core::metadata)
//! - **Samples** (points, residuals, analog channels) in [`io::formats::c3d::samples`](crate::io::formats::c3d::samples)
//! - **Byte orders** (IEEE little/big-endian and VAX) in [`encoding`](crate::encoding)
//!
//! ## Architecture
//!
//! The library is organized into layers:
//! - `core/` - Error taxonomy, parameter values, metadata tree and acquisition model
//! - `encoding/` - Byte-order strategies and the random-access byte stream
//! - `io/` - Format detection, the file I/O contract and the C3D format handler
//!
//! ## Example: Reading a C3D file
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use c3dcodec::{Acquisition, AcquisitionFileIo, C3dFormat};
//!
//! let mut io = C3dFormat::new();
//! let mut acq = Acquisition::new();
//! io.read("walk.c3d".as_ref(), &mut acq)?;
//! for point in &acq.points {
//!     println!("{}: {} frames", point.label, point.frame_count());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Writing big-endian floating-point data
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use c3dcodec::{Acquisition, AcquisitionFileIo, ByteOrder, C3dFormat, StorageFormat};
//!
//! let mut acq = Acquisition::new();
//! acq.init(2, 100, 0, 1);
//! acq.point_frequency = 100.0;
//!
//! let mut io = C3dFormat::builder()
//!     .byte_order(ByteOrder::IeeeBigEndian)
//!     .storage_format(StorageFormat::Float)
//!     .build();
//! io.write("out.c3d".as_ref(), &acq)?;
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{
    Acquisition, Analog, AnalogGain, CodecError, CollapseElement, Element, Event, MetadataNode,
    Point, PointType, PointUnits, Result, SplitElement, Value, ValueData, ValueKind,
    DEFAULT_ANALOG_RESOLUTION, UNNAMED_PREFIX,
};

// Byte orders and streams
pub mod encoding;

pub use encoding::ByteOrder;

// I/O types (detection, traits, format handlers)
pub mod io;

// Re-export key I/O types
pub use io::detection::{detect_format, FileFormat};
pub use io::formats::c3d::{
    AnalogFormat, C3dFormat, C3dFormatBuilder, CodecState, StorageFormat, WriterFlags,
};
pub use io::traits::AcquisitionFileIo;
