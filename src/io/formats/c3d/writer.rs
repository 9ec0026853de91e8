// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D writer.
//!
//! The file is assembled in memory: header in block 1, parameters from
//! block 2, then the data section. The parameter block count, the header
//! data-first-block word and POINT:DATA_START are written as placeholders
//! and patched once the parameter section size is known.

use tracing::debug;

use crate::encoding::{ByteStream, SeekOrigin};
use crate::{Acquisition, CodecError, Result};

use super::constants::*;
use super::header::{C3dHeader, HeaderEvent};
use super::parameters::write_parameters;
use super::samples::SampleCodec;
use super::state::CodecState;
use super::sync::synchronize;

/// First block of the parameter section in written files.
const PARAMETER_FIRST_BLOCK: usize = 2;

/// Encode `acq` as a complete C3D file.
///
/// The synchronization passes selected by `state.writer_flags` run first;
/// `state` ends up holding the scales that were written.
pub fn write_acquisition(acq: &Acquisition, state: &mut CodecState) -> Result<Vec<u8>> {
    acq.validate()?;
    let point_count = checked_u16("point count", acq.points.len())?;
    let spf = checked_u16("analog samples per frame", acq.analog_samples_per_frame)?;
    let analog_total = checked_u16(
        "analog samples per frame",
        acq.analogs.len() * acq.analog_samples_per_frame,
    )?;

    let plan = synchronize(acq, state)?;
    let mut stream = ByteStream::writer(state.byte_order);

    let header = C3dHeader {
        parameter_first_block: PARAMETER_FIRST_BLOCK as u8,
        point_count,
        analog_total: if acq.analogs.is_empty() { 0 } else { analog_total },
        first_frame: clamp_frame(acq.first_frame),
        last_frame: clamp_frame(acq.last_frame()),
        max_interpolation_gap: acq.max_interpolation_gap,
        point_scale: plan.scaling.point_scale as f32,
        data_first_block: 0,
        analog_per_frame: spf,
        frame_rate: plan.point_frequency as f32,
        events: acq
            .events
            .iter()
            .take(MAX_HEADER_EVENTS)
            .map(|e| HeaderEvent {
                label: e.label.chars().take(4).collect(),
                time: e.time as f32,
                displayed: true,
            })
            .collect(),
    };
    header.write(&mut stream)?;

    let layout = write_parameters(&mut stream, PARAMETER_FIRST_BLOCK, &plan.metadata, state.byte_order)?;
    let data_block = PARAMETER_FIRST_BLOCK + layout.blocks;
    C3dHeader::patch_data_first_block(&mut stream, data_block as u16)?;
    if let Some(position) = layout.data_start_position {
        let end = stream.write_position();
        stream.seek_write(position as i64, SeekOrigin::Begin)?;
        stream.write_i16(data_block as i16);
        stream.seek_write(end as i64, SeekOrigin::Begin)?;
    }

    stream.seek_write(block_offset(data_block) as i64, SeekOrigin::Begin)?;
    let codec = SampleCodec::select(state.storage_format, state.analog_format);
    codec.encode(&mut stream, &plan.scaling, acq);
    let end = stream.write_position();
    stream.fill(0, blocks_for(end) * BLOCK_SIZE - end);

    debug!(
        byte_order = state.byte_order.as_str(),
        storage = state.storage_format.as_str(),
        parameter_blocks = layout.blocks,
        data_block,
        bytes = stream.len(),
        "C3D acquisition encoded"
    );
    Ok(stream.into_inner())
}

fn checked_u16(section: &str, value: usize) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| CodecError::layout_overflow(section, value, usize::from(u16::MAX)))
}

/// Header frame index; indices that do not fit are marked with 65535 and
/// carried by TRIAL:ACTUAL_*_FIELD.
fn clamp_frame(frame: usize) -> u16 {
    u16::try_from(frame).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::ByteOrder;
    use crate::io::formats::c3d::reader::read_acquisition;
    use crate::io::formats::c3d::state::StorageFormat;
    use crate::{Analog, Point};

    fn sample() -> Acquisition {
        let mut acq = Acquisition::new();
        acq.init(0, 4, 0, 1);
        acq.point_frequency = 120.0;
        let mut p = Point::new("TOE", 4);
        p.values = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0], [0.0, 0.0, 0.0]];
        p.residuals = vec![0.0, 0.0, 0.0, -1.0];
        acq.add_point(p).unwrap();
        acq.add_analog(Analog::new("FZ", 4)).unwrap();
        acq
    }

    #[test]
    fn test_layout_is_block_aligned() {
        let mut state = CodecState::default();
        let bytes = write_acquisition(&sample(), &mut state).unwrap();
        assert_eq!(bytes.len() % BLOCK_SIZE, 0);
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], HEADER_KEY);
        let parameters = block_offset(2);
        assert_eq!(bytes[parameters + 1], HEADER_KEY);
        let blocks = usize::from(bytes[parameters + OFF_SECTION_BLOCKS]);
        let order = state.byte_order;
        let data_block = order.decode_u16(&bytes[OFF_DATA_BLOCK..OFF_DATA_BLOCK + 2]);
        assert_eq!(usize::from(data_block), 2 + blocks);
    }

    #[test]
    fn test_data_start_is_patched() {
        let mut state = CodecState {
            byte_order: ByteOrder::IeeeBigEndian,
            ..CodecState::default()
        };
        let bytes = write_acquisition(&sample(), &mut state).unwrap();
        let mut acq = Acquisition::new();
        read_acquisition(&bytes, &mut CodecState::default(), &mut acq).unwrap();
        let data_start: i32 = acq
            .metadata
            .parameter_value("POINT", "DATA_START")
            .and_then(|v| v.first())
            .unwrap();
        let header_block = i32::from(ByteOrder::IeeeBigEndian.decode_u16(&bytes[16..18]));
        assert_eq!(data_start, header_block);
    }

    #[test]
    fn test_float_storage_scale_is_negative() {
        let mut state = CodecState {
            storage_format: StorageFormat::Float,
            ..CodecState::default()
        };
        let bytes = write_acquisition(&sample(), &mut state).unwrap();
        let scale = state.byte_order.decode_f32(&bytes[OFF_POINT_SCALE..OFF_POINT_SCALE + 4]);
        assert!(scale < 0.0);
    }

    #[test]
    fn test_invalid_acquisition_rejected() {
        let mut acq = sample();
        acq.points[0].values.pop();
        let err = write_acquisition(&acq, &mut CodecState::default()).unwrap_err();
        assert!(matches!(err, CodecError::MalformedContainer { .. }));
    }

    #[test]
    fn test_large_frame_index_clamped() {
        assert_eq!(clamp_frame(70_000), u16::MAX);
        assert_eq!(clamp_frame(12), 12);
    }
}
