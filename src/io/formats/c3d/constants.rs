// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D format constants.
//!
//! Byte offsets are given from the start of the header block. The header is
//! word addressed in the format documentation: word `n` (1-based) starts at
//! byte `2 * (n - 1)`.

/// Size of a file block.
pub const BLOCK_SIZE: usize = 512;

/// Second byte of the header and of the parameter section.
pub const HEADER_KEY: u8 = 0x50;

/// Key marking 4-character event labels and the label/range section.
pub const EXTENDED_KEY: i16 = 12345;

/// Number of event slots in the header.
pub const MAX_HEADER_EVENTS: usize = 18;

/// Largest number of blocks the parameter section can declare.
pub const MAX_PARAMETER_BLOCKS: usize = 255;

/// Largest number of groups addressable by a linking ID.
pub const MAX_GROUPS: usize = 127;

/// Largest label length (the sign of the length byte is the lock flag).
pub const MAX_LABEL_LENGTH: usize = 127;

/// Largest description length.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

/// Integer units the largest coordinate maps to when deriving a scale.
pub const POINT_SCALE_TARGET: f64 = 32000.0;

/// Coordinate used by some producers to mark an occluded sample.
pub const MOTION_ANALYSIS_OCCLUSION: f64 = 9_999_999.0;

/// MANUFACTURER:COMPANY of producers storing labels in DESCRIPTIONS.
pub const MOTION_ANALYSIS_COMPANY: &str = "Motion Analysis Corp";

// Header layout (byte offsets)

pub const OFF_PARAMETER_BLOCK: usize = 0;
pub const OFF_KEY: usize = 1;
pub const OFF_POINT_SCALE: usize = 12;
pub const OFF_DATA_BLOCK: usize = 16;
pub const OFF_LABEL_RANGE_KEY: usize = 294;
pub const OFF_EVENT_KEY: usize = 298;
pub const OFF_EVENT_TIMES: usize = 304;
pub const OFF_EVENT_FLAGS: usize = 376;
pub const OFF_EVENT_LABELS: usize = 396;

// Parameter section layout (byte offsets from the section start)

pub const OFF_SECTION_BLOCKS: usize = 2;
pub const OFF_SECTION_PROCESSOR: usize = 3;

/// Byte offset of block `block` (1-based).
#[inline]
pub fn block_offset(block: usize) -> usize {
    BLOCK_SIZE * block.saturating_sub(1)
}

/// Number of blocks needed for `bytes` bytes.
#[inline]
pub fn blocks_for(bytes: usize) -> usize {
    bytes.div_ceil(BLOCK_SIZE)
}
