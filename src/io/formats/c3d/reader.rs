// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D reader.
//!
//! Decoding runs in a fixed order: probe the first two bytes, pick the byte
//! order from the processor-type byte of the parameter section, read the
//! header block (when present), read the parameter section, reconcile the
//! header with the metadata, then decode the data section and apply labels,
//! units and events.
//!
//! The header is the authority for counts and scales; metadata values that
//! disagree are reported and ignored. Files without a header block take
//! everything from the metadata.

use tracing::{debug, warn};

use crate::core::metadata::first_or;
use crate::encoding::{ByteOrder, ByteStream, SeekOrigin};
use crate::{
    Acquisition, AnalogGain, CodecError, Event, MetadataNode, PointType, Result, UNNAMED_PREFIX,
};

use super::constants::*;
use super::header::C3dHeader;
use super::parameters::read_parameters;
use super::samples::{SampleCodec, SampleScaling};
use super::state::{AnalogFormat, CodecState, StorageFormat};

/// Decode a complete C3D file held in `data` into `acq`.
///
/// `state` is refreshed from the file, except for its writer flags.
pub fn read_acquisition(data: &[u8], state: &mut CodecState, acq: &mut Acquisition) -> Result<()> {
    state.reset_for_read();
    acq.reset();

    let mut stream = ByteStream::new(data, ByteOrder::IeeeLittleEndian);
    let first_block = probe(&mut stream)?;
    state.byte_order = detect_byte_order(&mut stream, first_block)?;
    stream.set_byte_order(state.byte_order);

    let mut header = if first_block != 1 {
        C3dHeader::read(&mut stream)?
    } else {
        debug!("C3D file without header block");
        C3dHeader::template()
    };
    let data_block = if header.is_present() {
        usize::from(header.data_first_block)
    } else {
        0
    };
    let info = read_parameters(&mut stream, first_block, data_block, &mut acq.metadata)?;
    debug!(
        byte_order = state.byte_order.as_str(),
        parameter_blocks = info.blocks,
        "C3D parameter section read"
    );

    let root = &acq.metadata;
    if header.is_present() {
        cross_check_header(&header, root);
    } else {
        header_from_metadata(&mut header, root)?;
    }
    let (first_frame, last_frame) = frame_range(&header, root);

    state.storage_format = StorageFormat::from_scale(header.point_scale);
    state.point_scale = f64::from(header.point_scale).abs();
    let point_count = usize::from(header.point_count);
    let channels = header.analog_channel_count();
    let spf = if channels > 0 {
        usize::from(header.analog_per_frame.max(1))
    } else {
        1
    };
    let resolution = read_analog_configuration(root, channels, state);
    let motion_analysis = root
        .parameter_value("MANUFACTURER", "COMPANY")
        .and_then(|v| v.first_string())
        .is_some_and(|company| company == MOTION_ANALYSIS_COMPANY);

    let declared_frames = if last_frame >= first_frame {
        last_frame - first_frame + 1
    } else {
        0
    };
    let codec = SampleCodec::select(state.storage_format, state.analog_format);
    let frame_size = codec.frame_size(point_count, spf * channels);
    let data_block = usize::from(header.data_first_block);
    let mut frames = declared_frames;
    if frame_size > 0 && declared_frames > 0 {
        if data_block < first_block + info.blocks {
            return Err(CodecError::malformed(
                "data first block",
                format!(
                    "data section at block {data_block} overlaps the parameter section (blocks {first_block}..{})",
                    first_block + info.blocks
                ),
            ));
        }
        let available = stream.len().saturating_sub(block_offset(data_block));
        let capacity = available.div_ceil(frame_size);
        if capacity < declared_frames {
            warn!(
                expected = declared_frames,
                found = capacity,
                "C3D frame count exceeds the data section; frame count reduced"
            );
            frames = capacity;
        }
    }

    let metadata = std::mem::take(&mut acq.metadata);
    acq.init(point_count, frames, channels, spf);
    acq.metadata = metadata;
    acq.first_frame = first_frame;
    acq.point_frequency = f64::from(header.frame_rate);
    acq.max_interpolation_gap = header.max_interpolation_gap;
    acq.analog_resolution = resolution;

    if frame_size > 0 && frames > 0 {
        stream.seek_read(block_offset(data_block) as i64, SeekOrigin::Begin)?;
        let scaling = SampleScaling {
            point_scale: f64::from(header.point_scale),
            analog_scale: (0..channels).map(|i| state.analog_scale(i)).collect(),
            analog_offset: state.analog_zero_offset.clone(),
        };
        codec.decode(&mut stream, &scaling, acq, motion_analysis)?;
    }

    apply_point_metadata(acq, motion_analysis);
    apply_analog_metadata(acq, state, motion_analysis);
    acq.events = read_events(&acq.metadata, &header);
    debug!(
        points = point_count,
        analogs = channels,
        frames,
        events = acq.events.len(),
        "C3D acquisition decoded"
    );
    Ok(())
}

/// Check the first two bytes and return the parameter section first block.
fn probe<B: AsRef<[u8]>>(stream: &mut ByteStream<B>) -> Result<usize> {
    let first_block = stream.read_i8()?;
    let key = stream.read_u8()?;
    if first_block <= 0 {
        return Err(CodecError::malformed(
            "parameter first block",
            format!("block index {first_block} is not positive"),
        ));
    }
    if key != HEADER_KEY {
        return Err(CodecError::malformed(
            "header key",
            format!("expected {HEADER_KEY}, found {key}"),
        ));
    }
    Ok(first_block as usize)
}

fn detect_byte_order<B: AsRef<[u8]>>(
    stream: &mut ByteStream<B>,
    first_block: usize,
) -> Result<ByteOrder> {
    stream.seek_read(
        (block_offset(first_block) + OFF_SECTION_PROCESSOR) as i64,
        SeekOrigin::Begin,
    )?;
    let code = stream.read_i8()?;
    let (order, unbiased) = ByteOrder::from_processor_type(code).ok_or_else(|| {
        CodecError::malformed("processor type", format!("unknown processor type {code}"))
    })?;
    if unbiased {
        warn!(found = code, "C3D processor type stored without its +83 bias");
    }
    Ok(order)
}

fn cross_check_header(header: &C3dHeader, root: &MetadataNode) {
    if let Some(used) = root.parameter_value("POINT", "USED").and_then(|v| v.first::<u16>()) {
        if used != header.point_count {
            warn!(
                expected = header.point_count,
                found = used,
                "C3D POINT:USED differs from the header point count; header value kept"
            );
        }
    }
    if let Some(scale) = root.parameter_value("POINT", "SCALE").and_then(|v| v.first::<f32>()) {
        if (scale - header.point_scale).abs() > f32::EPSILON {
            warn!(
                expected = header.point_scale,
                found = scale,
                "C3D POINT:SCALE differs from the header scale; header value kept"
            );
        }
    }
    if let Some(used) = root.parameter_value("ANALOG", "USED").and_then(|v| v.first::<usize>()) {
        if used != header.analog_channel_count() {
            warn!(
                expected = header.analog_channel_count(),
                found = used,
                "C3D ANALOG:USED differs from the header channel count; header value kept"
            );
        }
    }
}

/// Fill a template header from POINT/ANALOG metadata.
fn header_from_metadata(header: &mut C3dHeader, root: &MetadataNode) -> Result<()> {
    let point = |name: &str| root.parameter_value("POINT", name);
    header.point_count = first_or(point("USED"), 0u16);
    header.point_scale = first_or(point("SCALE"), 0.1f32);
    if header.point_scale == 0.0 || header.point_scale.is_nan() {
        return Err(CodecError::malformed("point scale", "POINT:SCALE is zero"));
    }
    header.frame_rate = first_or(point("RATE"), 0.0f32);
    header.data_first_block = first_or(point("DATA_START"), 0u16);
    let frames = first_or(point("FRAMES"), 0u16);
    header.first_frame = 1;
    header.last_frame = frames;

    let channels = first_or(root.parameter_value("ANALOG", "USED"), 0u16);
    let analog_rate = first_or(root.parameter_value("ANALOG", "RATE"), 0.0f32);
    let spf = if header.frame_rate > 0.0 && analog_rate > 0.0 {
        (analog_rate / header.frame_rate).round().max(1.0) as u16
    } else {
        1
    };
    header.analog_per_frame = spf;
    header.analog_total = channels.saturating_mul(spf);
    Ok(())
}

/// First and last frame, with TRIAL:ACTUAL_*_FIELD taking precedence.
fn frame_range(header: &C3dHeader, root: &MetadataNode) -> (usize, usize) {
    let mut first = usize::from(header.first_frame);
    let mut last = usize::from(header.last_frame);
    let field = |name: &str| -> Option<usize> {
        let words: Vec<u16> = root.parameter_value("TRIAL", name)?.cast();
        match words.as_slice() {
            [lsb, msb, ..] => Some((usize::from(*msb) << 16) | usize::from(*lsb)),
            _ => None,
        }
    };
    if let Some(start) = field("ACTUAL_START_FIELD") {
        if start != first && header.first_frame != u16::MAX {
            warn!(
                header = first,
                trial = start,
                "C3D TRIAL:ACTUAL_START_FIELD overrides the header first frame"
            );
        }
        first = start;
    }
    if let Some(end) = field("ACTUAL_END_FIELD") {
        if end != last && header.last_frame != u16::MAX {
            warn!(
                header = last,
                trial = end,
                "C3D TRIAL:ACTUAL_END_FIELD overrides the header last frame"
            );
        }
        last = end;
    }
    (first, last)
}

/// Fill the analog part of `state`; returns the analog resolution.
fn read_analog_configuration(root: &MetadataNode, channels: usize, state: &mut CodecState) -> u8 {
    state.analog_channel_scale = vec![1.0; channels];
    state.analog_zero_offset = vec![0; channels];
    state.analog_universal_scale = 1.0;
    let Some(analog) = root.find_child("ANALOG") else {
        return crate::DEFAULT_ANALOG_RESOLUTION;
    };
    if analog.find_child("USED").is_none() {
        debug!("C3D ANALOG group without USED; analog configuration ignored");
        return crate::DEFAULT_ANALOG_RESOLUTION;
    }

    let bits = analog
        .find_child("BITS")
        .and_then(|n| n.value.as_ref())
        .and_then(|v| v.first::<u8>())
        .unwrap_or(crate::DEFAULT_ANALOG_RESOLUTION);
    let mut resolution = bits;
    let mut offsets: Vec<i32> = analog.collapse_children_values("OFFSET", Some(channels), 0);

    let mut needed = u32::from(bits);
    for &offset in &offsets {
        while needed < 32 && i64::from(offset).abs() > 1i64 << needed {
            needed += 2;
        }
    }
    let mut inferred = None;
    if needed != u32::from(bits) {
        let (adjusted, format) = if needed >= 16 {
            (16, AnalogFormat::Unsigned)
        } else {
            (12, AnalogFormat::Signed)
        };
        warn!(
            bits,
            adjusted,
            "C3D analog offsets do not fit ANALOG:BITS; resolution adjusted"
        );
        resolution = adjusted;
        inferred = Some(format);
    }

    let format_param = analog
        .find_child("FORMAT")
        .and_then(|n| n.value.as_ref())
        .and_then(|v| v.first_string());
    state.analog_format = match format_param.as_deref().map(str::trim) {
        Some(f) if f.eq_ignore_ascii_case("UNSIGNED") => AnalogFormat::Unsigned,
        Some(_) => AnalogFormat::Signed,
        None => inferred.unwrap_or(AnalogFormat::Signed),
    };
    if state.analog_format == AnalogFormat::Unsigned {
        for offset in &mut offsets {
            *offset = i32::from(*offset as i16 as u16);
        }
    }
    state.analog_zero_offset = offsets;
    state.analog_channel_scale = analog.collapse_children_values("SCALE", Some(channels), 1.0);

    let gen = first_or(
        analog.find_child("GEN_SCALE").and_then(|n| n.value.as_ref()),
        1.0f64,
    );
    state.analog_universal_scale = if gen == 0.0 {
        warn!("C3D ANALOG:GEN_SCALE is zero; using 1");
        1.0
    } else {
        gen
    };
    resolution
}

fn apply_point_metadata(acq: &mut Acquisition, motion_analysis: bool) {
    let count = acq.points.len();
    let Some(group) = acq.metadata.find_child("POINT") else {
        return;
    };
    let label_param = if motion_analysis {
        "DESCRIPTIONS"
    } else {
        "LABELS"
    };
    let labels = group.collapse_children_values(label_param, Some(count), UNNAMED_PREFIX.to_string());
    let descriptions = if motion_analysis {
        Vec::new()
    } else {
        group.collapse_children_values::<String>("DESCRIPTIONS", None, String::new())
    };
    for (point, label) in acq.points.iter_mut().zip(labels) {
        point.label = label;
    }
    for (point, description) in acq.points.iter_mut().zip(descriptions) {
        point.description = description;
    }

    if let Some(unit) = group
        .find_child("UNITS")
        .and_then(|n| n.value.as_ref())
        .and_then(|v| v.first_string())
    {
        acq.units.marker = unit;
    }
    for (point_type, list) in PointType::TYPED {
        let unit_param = format!("{}_UNITS", &list[..list.len() - 1]);
        if let Some(unit) = group
            .find_child(&unit_param)
            .and_then(|n| n.value.as_ref())
            .and_then(|v| v.first_string())
        {
            acq.units.set(point_type, unit);
        }
        for label in group.collapse_children_values::<String>(list, None, String::new()) {
            if let Some(point) = acq.points.iter_mut().find(|p| p.label == label) {
                point.point_type = point_type;
            }
        }
    }
}

fn apply_analog_metadata(acq: &mut Acquisition, state: &CodecState, motion_analysis: bool) {
    let count = acq.analogs.len();
    for (i, analog) in acq.analogs.iter_mut().enumerate() {
        analog.scale = state.analog_scale(i);
        analog.offset = state.analog_offset(i);
    }
    let Some(group) = acq.metadata.find_child("ANALOG") else {
        return;
    };
    let label_param = if motion_analysis {
        "DESCRIPTIONS"
    } else {
        "LABELS"
    };
    let labels = group.collapse_children_values(label_param, Some(count), UNNAMED_PREFIX.to_string());
    let descriptions = if motion_analysis {
        Vec::new()
    } else {
        group.collapse_children_values::<String>("DESCRIPTIONS", None, String::new())
    };
    let units = group.collapse_children_values::<String>("UNITS", None, String::new());
    let gains: Vec<i16> = group.collapse_children_values("GAIN", None, 0);

    for (i, analog) in acq.analogs.iter_mut().enumerate() {
        if let Some(label) = labels.get(i) {
            analog.label = label.clone();
        }
        if let Some(description) = descriptions.get(i) {
            analog.description = description.clone();
        }
        if let Some(unit) = units.get(i).filter(|u| !u.is_empty()) {
            analog.unit = unit.clone();
        }
        if let Some(&code) = gains.get(i) {
            analog.gain = AnalogGain::from_code(code).unwrap_or_else(|| {
                warn!(
                    channel = %analog.label,
                    code,
                    "C3D analog gain code not supported; gain left unknown"
                );
                AnalogGain::Unknown
            });
        }
    }
}

/// Events from the EVENT group, or from the header when the group is absent.
fn read_events(root: &MetadataNode, header: &C3dHeader) -> Vec<Event> {
    let group = match root.find_child("EVENT") {
        Some(group) => group,
        None => match root.find_child("EVENTS") {
            Some(group) => {
                warn!("C3D EVENTS group used instead of EVENT");
                group
            }
            None => {
                return header
                    .events
                    .iter()
                    .map(|e| Event::new(e.label.clone(), f64::from(e.time)))
                    .collect();
            }
        },
    };

    let declared = first_or(
        group.find_child("USED").and_then(|n| n.value.as_ref()),
        0i32,
    );
    if declared < 0 {
        warn!(used = declared, "C3D EVENT:USED is negative; no events read");
        return Vec::new();
    }
    let mut times: Vec<f64> = group.collapse_children_values("TIMES", None, 0.0);
    let stored = group
        .collapse_children_values::<String>("LABELS", None, String::new())
        .len()
        .max(times.len() / 2);
    let used = match usize::try_from(declared) {
        Ok(used) if used <= stored => used,
        _ => {
            warn!(
                expected = declared,
                found = stored,
                "C3D EVENT:USED exceeds the stored labels and times; count reduced"
            );
            stored
        }
    };
    if used == 0 {
        return Vec::new();
    }
    let labels = group.collapse_children_values("LABELS", Some(used), UNNAMED_PREFIX.to_string());
    if times.len() < 2 * used {
        warn!(
            expected = 2 * used,
            found = times.len(),
            "C3D EVENT:TIMES is too short; missing times set to 0"
        );
    }
    times.resize(2 * used, 0.0);
    let text = |name: &str| group.collapse_children_values::<String>(name, None, String::new());
    let (contexts, subjects, descriptions) = (text("CONTEXTS"), text("SUBJECTS"), text("DESCRIPTIONS"));
    let nth = |items: &[String], i: usize| items.get(i).cloned().unwrap_or_default();
    let icons: Vec<i32> = group.collapse_children_values("ICON_IDS", Some(used), 0);

    (0..used)
        .map(|i| Event {
            label: labels[i].clone(),
            time: 60.0 * times[2 * i] + times[2 * i + 1],
            context: nth(&contexts, i),
            subject: nth(&subjects, i),
            description: nth(&descriptions, i),
            id: icons[i],
        })
        .collect()
}

