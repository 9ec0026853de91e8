// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Per-file codec state and writer configuration.
//!
//! [`CodecState`] is filled by a read and consumed by a write. Callers that
//! want to rewrite a file with its original scales keep the state of the
//! read and pass it to the write; a fresh state gives defaults.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encoding::ByteOrder;

/// Sample storage format, encoded by the sign of the point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageFormat {
    /// 16-bit integers scaled by the point scale (positive scale)
    #[default]
    Integer,
    /// 32-bit floats (negative scale)
    Float,
}

impl StorageFormat {
    /// Storage format selected by the header point scale.
    pub fn from_scale(scale: f32) -> Self {
        if scale < 0.0 {
            StorageFormat::Float
        } else {
            StorageFormat::Integer
        }
    }

    /// Sign applied to the point scale written in the file.
    pub fn scale_sign(self) -> f64 {
        match self {
            StorageFormat::Integer => 1.0,
            StorageFormat::Float => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageFormat::Integer => "integer",
            StorageFormat::Float => "float",
        }
    }
}

impl FromStr for StorageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "integer" | "int" => Ok(StorageFormat::Integer),
            "float" | "real" => Ok(StorageFormat::Float),
            other => Err(format!(
                "invalid storage format '{other}', expected 'integer' or 'float'"
            )),
        }
    }
}

/// Signedness of integer analog samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnalogFormat {
    #[default]
    Signed,
    Unsigned,
}

impl AnalogFormat {
    /// Value of the ANALOG:FORMAT parameter.
    pub fn as_parameter(self) -> &'static str {
        match self {
            AnalogFormat::Signed => "SIGNED",
            AnalogFormat::Unsigned => "UNSIGNED",
        }
    }
}

bitflags::bitflags! {
    /// Synchronization passes run before a write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WriterFlags: u8 {
        /// Keep the output readable by Vicon Workstation
        const VICON_COMPATIBLE = 0b0001;
        /// Derive point and analog scales from the samples
        const SCALES_FROM_DATA = 0b0010;
        /// Take point and analog scales from POINT/ANALOG parameters
        const SCALES_FROM_METADATA = 0b0100;
        /// Regenerate POINT, ANALOG, FORCE_PLATFORM, TRIAL and EVENT groups
        const METADATA_FROM_DATA = 0b1000;
    }
}

impl Default for WriterFlags {
    fn default() -> Self {
        WriterFlags::SCALES_FROM_DATA | WriterFlags::METADATA_FROM_DATA
    }
}

/// Mutable state of a C3D codec bound to one file at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecState {
    pub byte_order: ByteOrder,
    pub storage_format: StorageFormat,
    pub analog_format: AnalogFormat,
    /// Point scale magnitude; the sign lives in `storage_format`
    pub point_scale: f64,
    /// Per-channel scale, excluding the universal scale
    pub analog_channel_scale: Vec<f64>,
    /// Per-channel zero offset on the raw side
    pub analog_zero_offset: Vec<i32>,
    /// ANALOG:GEN_SCALE
    pub analog_universal_scale: f64,
    pub writer_flags: WriterFlags,
}

impl Default for CodecState {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::native(),
            storage_format: StorageFormat::Integer,
            analog_format: AnalogFormat::Signed,
            point_scale: 0.1,
            analog_channel_scale: Vec::new(),
            analog_zero_offset: Vec::new(),
            analog_universal_scale: 1.0,
            writer_flags: WriterFlags::default(),
        }
    }
}

impl CodecState {
    /// Reset everything a read refreshes, keeping the writer flags.
    pub fn reset_for_read(&mut self) {
        *self = Self {
            writer_flags: self.writer_flags,
            ..Self::default()
        };
    }

    /// Signed point scale as written in the header.
    pub fn signed_point_scale(&self) -> f64 {
        self.point_scale.abs() * self.storage_format.scale_sign()
    }

    /// Scale applied to raw samples of channel `idx`.
    pub fn analog_scale(&self, idx: usize) -> f64 {
        self.analog_channel_scale.get(idx).copied().unwrap_or(1.0) * self.analog_universal_scale
    }

    /// Zero offset of channel `idx`.
    pub fn analog_offset(&self, idx: usize) -> i32 {
        self.analog_zero_offset.get(idx).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let flags = WriterFlags::default();
        assert!(flags.contains(WriterFlags::SCALES_FROM_DATA));
        assert!(flags.contains(WriterFlags::METADATA_FROM_DATA));
        assert!(!flags.contains(WriterFlags::VICON_COMPATIBLE));
    }

    #[test]
    fn test_storage_from_scale() {
        assert_eq!(StorageFormat::from_scale(0.1), StorageFormat::Integer);
        assert_eq!(StorageFormat::from_scale(-0.1), StorageFormat::Float);
        assert_eq!("FLOAT".parse::<StorageFormat>(), Ok(StorageFormat::Float));
    }

    #[test]
    fn test_reset_keeps_flags() {
        let mut state = CodecState {
            point_scale: 3.0,
            writer_flags: WriterFlags::VICON_COMPATIBLE,
            ..CodecState::default()
        };
        state.reset_for_read();
        assert_eq!(state.point_scale, 0.1);
        assert_eq!(state.writer_flags, WriterFlags::VICON_COMPATIBLE);
    }

    #[test]
    fn test_signed_scale_and_channel_lookup() {
        let state = CodecState {
            storage_format: StorageFormat::Float,
            point_scale: 0.5,
            analog_channel_scale: vec![2.0],
            analog_universal_scale: 0.5,
            ..CodecState::default()
        };
        assert_eq!(state.signed_point_scale(), -0.5);
        assert_eq!(state.analog_scale(0), 1.0);
        assert_eq!(state.analog_scale(5), 0.5);
        assert_eq!(state.analog_offset(5), 0);
    }
}
