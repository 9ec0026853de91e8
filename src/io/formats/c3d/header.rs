// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D header block.
//!
//! The header occupies the first 512-byte block:
//!
//! ```text
//! byte 0    parameter section first block (int8)
//! byte 1    key 0x50
//! byte 2    point count
//! byte 4    analog samples per point frame, all channels
//! byte 6    first frame
//! byte 8    last frame
//! byte 10   maximum interpolation gap
//! byte 12   point scale (float, negative for float storage)
//! byte 16   data section first block
//! byte 18   analog samples per point frame, one channel
//! byte 20   point frame rate (float)
//! byte 294  label and range key (12345) and block
//! byte 298  event label key (12345 for 4-character labels)
//! byte 300  event count
//! byte 304  event times (18 floats)
//! byte 376  event display flags (18 bytes)
//! byte 396  event labels (18 x 4 or 2 characters)
//! ```

use tracing::warn;

use crate::encoding::{ByteStream, SeekOrigin};
use crate::{CodecError, Result};

use super::constants::*;

/// Event stored in the header event table.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderEvent {
    pub label: String,
    /// Time in seconds
    pub time: f32,
    pub displayed: bool,
}

/// Decoded header block.
#[derive(Debug, Clone, PartialEq)]
pub struct C3dHeader {
    pub parameter_first_block: u8,
    pub point_count: u16,
    /// Analog samples per point frame over all channels
    pub analog_total: u16,
    pub first_frame: u16,
    pub last_frame: u16,
    pub max_interpolation_gap: u16,
    pub point_scale: f32,
    pub data_first_block: u16,
    /// Analog samples per point frame for a single channel
    pub analog_per_frame: u16,
    pub frame_rate: f32,
    pub events: Vec<HeaderEvent>,
}

impl Default for C3dHeader {
    fn default() -> Self {
        Self {
            parameter_first_block: 2,
            point_count: 0,
            analog_total: 0,
            first_frame: 1,
            last_frame: 0,
            max_interpolation_gap: 0,
            point_scale: 0.1,
            data_first_block: 0,
            analog_per_frame: 1,
            frame_rate: 0.0,
            events: Vec::new(),
        }
    }
}

impl C3dHeader {
    /// Header of a file without header block (parameters in block 1).
    pub fn template() -> Self {
        Self {
            parameter_first_block: 1,
            ..Self::default()
        }
    }

    /// Whether the file has a header block.
    pub fn is_present(&self) -> bool {
        self.parameter_first_block != 1
    }

    /// Number of analog channels implied by the header.
    pub fn analog_channel_count(&self) -> usize {
        let per_frame = usize::from(self.analog_per_frame.max(1));
        usize::from(self.analog_total) / per_frame
    }

    /// Read the header block; the stream byte order must already be set.
    pub fn read<B: AsRef<[u8]>>(stream: &mut ByteStream<B>) -> Result<Self> {
        stream.seek_read(OFF_PARAMETER_BLOCK as i64, SeekOrigin::Begin)?;
        let parameter_first_block = stream.read_u8()?;
        let key = stream.read_u8()?;
        if key != HEADER_KEY {
            return Err(CodecError::malformed(
                "header key",
                format!("expected {HEADER_KEY}, found {key}"),
            ));
        }
        let point_count = stream.read_u16()?;
        let analog_total = stream.read_u16()?;
        let first_frame = stream.read_u16()?;
        let last_frame = stream.read_u16()?;
        let max_interpolation_gap = stream.read_u16()?;
        let point_scale = stream.read_f32()?;
        if point_scale == 0.0 || point_scale.is_nan() {
            return Err(CodecError::malformed("point scale", "scale factor is zero"));
        }
        let data_first_block = stream.read_u16()?;
        let analog_per_frame = stream.read_u16()?;
        let frame_rate = stream.read_f32()?;
        if frame_rate <= 0.0 {
            warn!(frame_rate, "C3D header frame rate is not positive");
        }

        stream.seek_read(OFF_LABEL_RANGE_KEY as i64, SeekOrigin::Begin)?;
        if stream.read_i16()? == EXTENDED_KEY {
            let block = stream.read_u16()?;
            warn!(
                block,
                "C3D label and range section found; it is not interpreted"
            );
        }

        stream.seek_read(OFF_EVENT_KEY as i64, SeekOrigin::Begin)?;
        let label_width = if stream.read_i16()? == EXTENDED_KEY {
            4
        } else {
            2
        };
        let count = usize::try_from(stream.read_i16()?)
            .unwrap_or(0)
            .min(MAX_HEADER_EVENTS);
        stream.seek_read(OFF_EVENT_TIMES as i64, SeekOrigin::Begin)?;
        let times = stream.read_f32s(MAX_HEADER_EVENTS)?;
        stream.seek_read(OFF_EVENT_FLAGS as i64, SeekOrigin::Begin)?;
        let flags = stream.read_bytes(MAX_HEADER_EVENTS)?.to_vec();
        stream.seek_read(OFF_EVENT_LABELS as i64, SeekOrigin::Begin)?;
        let mut events = Vec::with_capacity(count);
        for i in 0..count {
            let label = stream.read_string(label_width)?;
            events.push(HeaderEvent {
                label: label.trim().to_string(),
                time: times[i],
                displayed: flags[i] != 0,
            });
        }

        Ok(Self {
            parameter_first_block,
            point_count,
            analog_total,
            first_frame,
            last_frame,
            max_interpolation_gap,
            point_scale,
            data_first_block,
            analog_per_frame,
            frame_rate,
            events,
        })
    }

    /// Write the header block at the start of the stream.
    ///
    /// Events beyond the 18 header slots are ignored; the writer always
    /// uses 4-character labels.
    pub fn write(&self, stream: &mut ByteStream<Vec<u8>>) -> Result<()> {
        stream.seek_write(OFF_PARAMETER_BLOCK as i64, SeekOrigin::Begin)?;
        stream.write_u8(self.parameter_first_block);
        stream.write_u8(HEADER_KEY);
        stream.write_u16(self.point_count);
        stream.write_u16(self.analog_total);
        stream.write_u16(self.first_frame);
        stream.write_u16(self.last_frame);
        stream.write_u16(self.max_interpolation_gap);
        stream.write_f32(self.point_scale);
        stream.write_u16(self.data_first_block);
        stream.write_u16(self.analog_per_frame);
        stream.write_f32(self.frame_rate);
        stream.fill(0, OFF_LABEL_RANGE_KEY - stream.write_position());

        stream.write_i16(0);
        stream.write_u16(0);
        stream.seek_write(OFF_EVENT_KEY as i64, SeekOrigin::Begin)?;
        stream.write_i16(EXTENDED_KEY);
        let events = &self.events[..self.events.len().min(MAX_HEADER_EVENTS)];
        stream.write_i16(events.len() as i16);
        stream.write_u16(0);
        for slot in 0..MAX_HEADER_EVENTS {
            stream.write_f32(events.get(slot).map_or(0.0, |e| e.time));
        }
        stream.seek_write(OFF_EVENT_FLAGS as i64, SeekOrigin::Begin)?;
        for slot in 0..MAX_HEADER_EVENTS {
            stream.write_u8(u8::from(events.get(slot).is_some_and(|e| e.displayed)));
        }
        stream.write_u16(0);
        stream.seek_write(OFF_EVENT_LABELS as i64, SeekOrigin::Begin)?;
        for slot in 0..MAX_HEADER_EVENTS {
            stream.write_string(events.get(slot).map_or("", |e| e.label.as_str()), 4);
        }
        stream.fill(0, BLOCK_SIZE - stream.write_position());
        Ok(())
    }

    /// Patch the data first block of an already written header.
    pub fn patch_data_first_block(stream: &mut ByteStream<Vec<u8>>, block: u16) -> Result<()> {
        let end = stream.write_position();
        stream.seek_write(OFF_DATA_BLOCK as i64, SeekOrigin::Begin)?;
        stream.write_u16(block);
        stream.seek_write(end as i64, SeekOrigin::Begin)?;
        Ok(())
    }
}
