// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout c3dcodec.
//!
//! This module provides the foundational types for the library:
//! - [`CodecError`] - Error taxonomy of the codec
//! - [`Value`] - Typed N-dimensional parameter value
//! - [`MetadataNode`] - Group/parameter tree
//! - [`Acquisition`] - Points, analog channels and events

pub mod acquisition;
pub mod error;
pub mod metadata;
pub mod value;

pub use acquisition::{
    Acquisition, Analog, AnalogGain, Event, Point, PointType, PointUnits,
    DEFAULT_ANALOG_RESOLUTION, UNNAMED_PREFIX,
};
pub use error::{CodecError, Result};
pub use metadata::{CollapseElement, MetadataNode, SplitElement};
pub use value::{Element, Value, ValueData, ValueKind};
