// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! File format implementations for motion capture data.
//!
//! This module contains readers and writers for acquisition file formats:
//! - [`c3d`]: C3D (Coordinate 3D) format support

pub mod c3d;
