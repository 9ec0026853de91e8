// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Binary stream layer.
//!
//! This module provides byte-order polymorphic primitive access:
//! - [`byte_order`] - IEEE little/big-endian and VAX strategies
//! - [`stream`] - Random-access stream with independent read/write cursors

pub mod byte_order;
pub mod stream;

pub use byte_order::{ByteOrder, ParseByteOrderError};
pub use stream::{ByteStream, SeekOrigin, StreamError};
