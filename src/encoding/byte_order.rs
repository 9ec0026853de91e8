// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Byte-order strategies for C3D streams.
//!
//! C3D files carry one of three numeric representations, selected by the
//! processor-type byte of the parameter section:
//!
//! | Processor | Code | Integers       | Floats              |
//! |-----------|------|----------------|---------------------|
//! | Intel     | 84   | little-endian  | IEEE little-endian  |
//! | DEC       | 85   | little-endian  | VAX F/G-float       |
//! | MIPS      | 86   | big-endian     | IEEE big-endian     |
//!
//! VAX floats are not a byte permutation of IEEE floats. A VAX F-float is
//! two 16-bit words stored little-endian, with the word holding the sign and
//! exponent first. Its value is `0.1f * 2^(e - 128)` while IEEE uses
//! `1.f * 2^(e - 127)`, so once the words are swapped into IEEE order the
//! exponent field must be lowered by 2.

use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use serde::{Deserialize, Serialize};

/// Offset added to the processor type by conforming writers.
pub const PROCESSOR_TYPE_BIAS: i8 = 83;

/// Byte-order strategy of a C3D stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    /// DEC processors: little-endian integers, VAX floats
    VaxLittleEndian,
    /// Intel processors
    #[default]
    IeeeLittleEndian,
    /// MIPS/SGI processors
    IeeeBigEndian,
}

/// Error returned when parsing a `ByteOrder` from string fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseByteOrderError {
    _private: (),
}

impl std::fmt::Display for ParseByteOrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid byte order, expected 'vax-le', 'ieee-le', or 'ieee-be'"
        )
    }
}

impl std::error::Error for ParseByteOrderError {}

impl FromStr for ByteOrder {
    type Err = ParseByteOrderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vax-le" | "vax" | "dec" => Ok(ByteOrder::VaxLittleEndian),
            "ieee-le" | "intel" | "le" => Ok(ByteOrder::IeeeLittleEndian),
            "ieee-be" | "mips" | "be" => Ok(ByteOrder::IeeeBigEndian),
            _ => Err(ParseByteOrderError { _private: () }),
        }
    }
}

impl ByteOrder {
    /// Byte order of the running platform.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::IeeeBigEndian
        } else {
            ByteOrder::IeeeLittleEndian
        }
    }

    /// Decode a processor-type byte.
    ///
    /// Accepts biased values (84, 85, 86) and raw ones (1, 2, 3). The second
    /// element of the tuple is `true` when the bias was missing.
    pub fn from_processor_type(code: i8) -> Option<(Self, bool)> {
        let (raw, unbiased) = if code > PROCESSOR_TYPE_BIAS {
            (code - PROCESSOR_TYPE_BIAS, false)
        } else {
            (code, true)
        };
        let order = match raw {
            1 => ByteOrder::IeeeLittleEndian,
            2 => ByteOrder::VaxLittleEndian,
            3 => ByteOrder::IeeeBigEndian,
            _ => return None,
        };
        Some((order, unbiased))
    }

    /// Processor-type byte written for this byte order.
    pub fn processor_type(self) -> i8 {
        PROCESSOR_TYPE_BIAS
            + match self {
                ByteOrder::IeeeLittleEndian => 1,
                ByteOrder::VaxLittleEndian => 2,
                ByteOrder::IeeeBigEndian => 3,
            }
    }

    /// Whether integers are stored big-endian.
    #[inline]
    pub fn is_big_endian(self) -> bool {
        matches!(self, ByteOrder::IeeeBigEndian)
    }

    /// Convert to string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ByteOrder::VaxLittleEndian => "vax-le",
            ByteOrder::IeeeLittleEndian => "ieee-le",
            ByteOrder::IeeeBigEndian => "ieee-be",
        }
    }

    pub(crate) fn decode_u16(self, buf: &[u8]) -> u16 {
        if self.is_big_endian() {
            BigEndian::read_u16(buf)
        } else {
            LittleEndian::read_u16(buf)
        }
    }

    pub(crate) fn decode_u32(self, buf: &[u8]) -> u32 {
        if self.is_big_endian() {
            BigEndian::read_u32(buf)
        } else {
            LittleEndian::read_u32(buf)
        }
    }

    pub(crate) fn decode_u64(self, buf: &[u8]) -> u64 {
        if self.is_big_endian() {
            BigEndian::read_u64(buf)
        } else {
            LittleEndian::read_u64(buf)
        }
    }

    pub(crate) fn decode_f32(self, buf: &[u8]) -> f32 {
        match self {
            ByteOrder::IeeeLittleEndian => LittleEndian::read_f32(buf),
            ByteOrder::IeeeBigEndian => BigEndian::read_f32(buf),
            ByteOrder::VaxLittleEndian => vax_f32_from_bytes([buf[0], buf[1], buf[2], buf[3]]),
        }
    }

    pub(crate) fn decode_f64(self, buf: &[u8]) -> f64 {
        match self {
            ByteOrder::IeeeLittleEndian => LittleEndian::read_f64(buf),
            ByteOrder::IeeeBigEndian => BigEndian::read_f64(buf),
            ByteOrder::VaxLittleEndian => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&buf[..8]);
                vax_f64_from_bytes(raw)
            }
        }
    }

    pub(crate) fn encode_u16(self, buf: &mut [u8], v: u16) {
        if self.is_big_endian() {
            BigEndian::write_u16(buf, v)
        } else {
            LittleEndian::write_u16(buf, v)
        }
    }

    pub(crate) fn encode_u32(self, buf: &mut [u8], v: u32) {
        if self.is_big_endian() {
            BigEndian::write_u32(buf, v)
        } else {
            LittleEndian::write_u32(buf, v)
        }
    }

    pub(crate) fn encode_u64(self, buf: &mut [u8], v: u64) {
        if self.is_big_endian() {
            BigEndian::write_u64(buf, v)
        } else {
            LittleEndian::write_u64(buf, v)
        }
    }

    pub(crate) fn encode_f32(self, buf: &mut [u8], v: f32) {
        match self {
            ByteOrder::IeeeLittleEndian => LittleEndian::write_f32(buf, v),
            ByteOrder::IeeeBigEndian => BigEndian::write_f32(buf, v),
            ByteOrder::VaxLittleEndian => buf[..4].copy_from_slice(&vax_f32_to_bytes(v)),
        }
    }

    pub(crate) fn encode_f64(self, buf: &mut [u8], v: f64) {
        match self {
            ByteOrder::IeeeLittleEndian => LittleEndian::write_f64(buf, v),
            ByteOrder::IeeeBigEndian => BigEndian::write_f64(buf, v),
            ByteOrder::VaxLittleEndian => buf[..8].copy_from_slice(&vax_f64_to_bytes(v)),
        }
    }
}

// ============================================================================
// VAX F-float (32-bit)
// ============================================================================

const F_EXPONENT_SHIFT: u32 = 23;
const F_EXPONENT_MASK: u32 = 0xFF;
const F_FRACTION_MASK: u32 = 0x007F_FFFF;

/// Decode a VAX F-float from its four file bytes.
///
/// Exponent 0 with the sign clear is zero; with the sign set it is the VAX
/// reserved operand, decoded as NaN. Exponents 1 and 2 fall below the IEEE
/// normal range and are rebuilt from the mantissa.
pub fn vax_f32_from_bytes(raw: [u8; 4]) -> f32 {
    let bits = u32::from_le_bytes([raw[2], raw[3], raw[0], raw[1]]);
    let negative = bits & 0x8000_0000 != 0;
    let exponent = (bits >> F_EXPONENT_SHIFT) & F_EXPONENT_MASK;
    match exponent {
        0 if negative => f32::NAN,
        0 => 0.0,
        1 | 2 => {
            let mantissa = f64::from((bits & F_FRACTION_MASK) | (1 << F_EXPONENT_SHIFT));
            let magnitude = mantissa * 2f64.powi(exponent as i32 - 152);
            let value = magnitude as f32;
            if negative {
                -value
            } else {
                value
            }
        }
        _ => f32::from_bits(bits - (2 << F_EXPONENT_SHIFT)),
    }
}

/// Encode an `f32` as the four file bytes of a VAX F-float.
///
/// Values beyond the VAX range saturate to the largest representable
/// magnitude; NaN and IEEE subnormals are written as zero.
pub fn vax_f32_to_bytes(value: f32) -> [u8; 4] {
    let bits = value.to_bits();
    let exponent = (bits >> F_EXPONENT_SHIFT) & F_EXPONENT_MASK;
    let vax = if value.is_nan() || exponent == 0 {
        0
    } else if exponent + 2 > F_EXPONENT_MASK {
        (bits & 0x8000_0000) | 0x7FFF_FFFF
    } else {
        bits + (2 << F_EXPONENT_SHIFT)
    };
    let le = vax.to_le_bytes();
    [le[2], le[3], le[0], le[1]]
}

// ============================================================================
// VAX G-float (64-bit)
// ============================================================================

const G_EXPONENT_SHIFT: u64 = 52;
const G_EXPONENT_MASK: u64 = 0x7FF;

/// Decode a VAX G-float from its eight file bytes.
///
/// The four 16-bit words are stored most significant first, each word
/// little-endian.
pub fn vax_f64_from_bytes(raw: [u8; 8]) -> f64 {
    let bits = u64::from_le_bytes([
        raw[6], raw[7], raw[4], raw[5], raw[2], raw[3], raw[0], raw[1],
    ]);
    let negative = bits & 0x8000_0000_0000_0000 != 0;
    let exponent = (bits >> G_EXPONENT_SHIFT) & G_EXPONENT_MASK;
    match exponent {
        0 if negative => f64::NAN,
        0 => 0.0,
        1 | 2 => {
            let mantissa = ((bits & ((1 << G_EXPONENT_SHIFT) - 1)) | (1 << G_EXPONENT_SHIFT)) as f64;
            let magnitude = mantissa * 2f64.powi(exponent as i32 - 1077);
            if negative {
                -magnitude
            } else {
                magnitude
            }
        }
        _ => f64::from_bits(bits - (2 << G_EXPONENT_SHIFT)),
    }
}

/// Encode an `f64` as the eight file bytes of a VAX G-float.
pub fn vax_f64_to_bytes(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let exponent = (bits >> G_EXPONENT_SHIFT) & G_EXPONENT_MASK;
    let vax = if value.is_nan() || exponent == 0 {
        0
    } else if exponent + 2 > G_EXPONENT_MASK {
        (bits & 0x8000_0000_0000_0000) | 0x7FFF_FFFF_FFFF_FFFF
    } else {
        bits + (2 << G_EXPONENT_SHIFT)
    };
    let le = vax.to_le_bytes();
    [le[6], le[7], le[4], le[5], le[2], le[3], le[0], le[1]]
}
