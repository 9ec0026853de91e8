// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Synchronization of metadata and scales before a write.
//!
//! The passes run on a copy of the acquisition metadata, in this order:
//!
//! 1. scales from metadata (POINT:SCALE, ANALOG:SCALE/OFFSET/GEN_SCALE)
//! 2. scales from data (point scale from the largest coordinate, analog
//!    scales re-derived when samples would not fit the integer range)
//! 3. metadata from data (POINT, ANALOG, FORCE_PLATFORM, TRIAL, EVENT and
//!    EVENT_CONTEXT regenerated from the acquisition)
//! 4. Vicon compatibility
//!
//! Each pass is enabled by a [`WriterFlags`] bit. Without any scale pass,
//! analog scales come from the [`Analog`](crate::Analog) channels and the
//! point scale from the codec state. Frame indices beyond the 16-bit header
//! range always get TRIAL:ACTUAL_*_FIELD, whatever the flags.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::core::metadata::continuation_label;
use crate::{Acquisition, CodecError, MetadataNode, PointType, Result, Value, ValueData};

use super::constants::POINT_SCALE_TARGET;
use super::samples::SampleScaling;
use super::state::{AnalogFormat, CodecState, StorageFormat, WriterFlags};

/// Everything the writer needs besides the acquisition samples.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan {
    pub metadata: MetadataNode,
    /// Point rate written to the header
    pub point_frequency: f64,
    pub scaling: SampleScaling,
}

/// Run the passes selected by `state.writer_flags`.
///
/// `state` receives the scales that will be written.
pub fn synchronize(acq: &Acquisition, state: &mut CodecState) -> Result<WritePlan> {
    let flags = state.writer_flags;
    let mut metadata = acq.metadata.clone();
    let channels = acq.analogs.len();

    if state.analog_universal_scale == 0.0 || !state.analog_universal_scale.is_finite() {
        state.analog_universal_scale = 1.0;
    }
    let universal = state.analog_universal_scale;
    state.analog_channel_scale = acq.analogs.iter().map(|a| a.scale / universal).collect();
    state.analog_zero_offset = acq.analogs.iter().map(|a| a.offset).collect();
    if state.point_scale == 0.0 || !state.point_scale.is_finite() {
        state.point_scale = 0.1;
    }

    if flags.contains(WriterFlags::SCALES_FROM_METADATA) {
        scales_from_metadata(&metadata, channels, state);
    }
    if flags.contains(WriterFlags::SCALES_FROM_DATA) {
        scales_from_data(acq, state);
    }
    let mut point_frequency = acq.point_frequency;
    if flags.contains(WriterFlags::METADATA_FROM_DATA) {
        metadata_from_data(acq, state, &mut metadata)?;
    } else if acq.last_frame() > usize::from(u16::MAX) {
        debug!(
            last_frame = acq.last_frame(),
            "C3D frame range exceeds the header; TRIAL fields written"
        );
        write_trial_range(acq, &mut metadata)?;
    }
    if flags.contains(WriterFlags::VICON_COMPATIBLE) {
        point_frequency = vicon_compatibility(acq, &mut metadata, point_frequency)?;
    }

    let scaling = SampleScaling {
        point_scale: state.signed_point_scale(),
        analog_scale: (0..channels).map(|i| state.analog_scale(i)).collect(),
        analog_offset: state.analog_zero_offset.clone(),
    };
    debug!(
        point_scale = scaling.point_scale,
        universal = state.analog_universal_scale,
        "C3D scales synchronized"
    );
    Ok(WritePlan {
        metadata,
        point_frequency,
        scaling,
    })
}

fn scales_from_metadata(root: &MetadataNode, channels: usize, state: &mut CodecState) {
    if let Some(scale) = root
        .parameter_value("POINT", "SCALE")
        .and_then(|v| v.first::<f64>())
        .filter(|s| *s != 0.0)
    {
        state.point_scale = scale.abs();
    }
    let Some(analog) = root.find_child("ANALOG") else {
        return;
    };
    if analog.find_child("SCALE").is_some() {
        state.analog_channel_scale = analog.collapse_children_values("SCALE", Some(channels), 1.0);
    }
    if analog.find_child("OFFSET").is_some() {
        let mut offsets: Vec<i32> = analog.collapse_children_values("OFFSET", Some(channels), 0);
        if state.analog_format == AnalogFormat::Unsigned {
            for offset in &mut offsets {
                *offset = i32::from(*offset as i16 as u16);
            }
        }
        state.analog_zero_offset = offsets;
    }
    if let Some(gen) = analog
        .find_child("GEN_SCALE")
        .and_then(|n| n.value.as_ref())
        .and_then(|v| v.first::<f64>())
        .filter(|g| *g != 0.0)
    {
        state.analog_universal_scale = gen;
    }
}

fn scales_from_data(acq: &Acquisition, state: &mut CodecState) {
    let max = acq
        .points
        .iter()
        .flat_map(|p| {
            p.values
                .iter()
                .zip(&p.residuals)
                .filter(|(_, r)| **r >= 0.0)
                .flat_map(|(v, _)| v.iter())
        })
        .fold(0.0f64, |m, c| m.max(c.abs()));
    if max > 0.0 {
        let units = max / state.point_scale;
        if units > f64::from(i16::MAX) || units < POINT_SCALE_TARGET / 2.0 {
            state.point_scale = max / POINT_SCALE_TARGET;
            debug!(max, scale = state.point_scale, "C3D point scale derived from data");
        }
    }

    if state.storage_format == StorageFormat::Float {
        return;
    }
    let (low, high) = match state.analog_format {
        AnalogFormat::Signed => (f64::from(i16::MIN), f64::from(i16::MAX)),
        AnalogFormat::Unsigned => (0.0, f64::from(u16::MAX)),
    };
    let universal = state.analog_universal_scale;
    for (i, analog) in acq.analogs.iter().enumerate() {
        let offset = f64::from(state.analog_offset(i));
        let scale = state.analog_scale(i);
        let fits = scale != 0.0
            && analog.values.iter().all(|v| {
                let raw = v / scale + offset;
                (low..=high).contains(&raw)
            });
        if fits {
            continue;
        }
        let peak = analog.values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let room = (offset - low).min(high - offset).max(1.0);
        let channel = if peak > 0.0 {
            peak / (room * 0.97) / universal
        } else {
            1.0
        };
        warn!(
            channel = %analog.label,
            scale = channel,
            "C3D analog samples do not fit the current scale; scale re-derived"
        );
        if let Some(slot) = state.analog_channel_scale.get_mut(i) {
            *slot = channel;
        }
    }
}

fn metadata_from_data(acq: &Acquisition, state: &CodecState, root: &mut MetadataNode) -> Result<()> {
    let frames = acq.frame_count();

    let point = root.ensure_group("POINT", "3-D point parameters");
    point.create_or_replace_child("USED", Value::int16(acq.points.len() as i16));
    point.create_or_replace_child("SCALE", Value::float(state.signed_point_scale() as f32));
    point.create_or_replace_child("RATE", Value::float(acq.point_frequency as f32));
    point.create_or_replace_child("DATA_START", Value::int16(0));
    point.create_or_replace_child("FRAMES", Value::int16(frames.min(usize::from(u16::MAX)) as u16 as i16));
    if frames > usize::from(u16::MAX) {
        point.create_or_replace_child("LONG_FRAMES", Value::float(frames as f32));
    } else {
        point.remove_child("LONG_FRAMES");
    }
    let labels: Vec<String> = acq.points.iter().map(|p| p.label.clone()).collect();
    let descriptions: Vec<String> = acq.points.iter().map(|p| p.description.clone()).collect();
    point.split_and_create_children("LABELS", &labels)?;
    point.split_and_create_children("DESCRIPTIONS", &descriptions)?;
    point.create_or_replace_child("UNITS", Value::string(acq.units.marker.clone()));
    for (point_type, list) in PointType::TYPED {
        let unit_param = format!("{}_UNITS", &list[..list.len() - 1]);
        let typed: Vec<String> = acq
            .points
            .iter()
            .filter(|p| p.point_type == point_type)
            .map(|p| p.label.clone())
            .collect();
        if typed.is_empty() {
            let mut index = 1;
            while point.remove_child(&continuation_label(list, index)).is_some() {
                index += 1;
            }
            continue;
        }
        point.split_and_create_children(list, &typed)?;
        point.create_or_replace_child(&unit_param, Value::string(acq.units.get(point_type)));
    }
    point.create_child_if_missing("X_SCREEN", Value::string("+X"));
    point.create_child_if_missing("Y_SCREEN", Value::string("+Y"));

    let channels = acq.analogs.len();
    let analog = root.ensure_group("ANALOG", "Analog data parameters");
    analog.create_or_replace_child("USED", Value::int16(channels as i16));
    let labels: Vec<String> = acq.analogs.iter().map(|a| a.label.clone()).collect();
    let descriptions: Vec<String> = acq.analogs.iter().map(|a| a.description.clone()).collect();
    let units: Vec<String> = acq.analogs.iter().map(|a| a.unit.clone()).collect();
    let scales: Vec<f32> = state
        .analog_channel_scale
        .iter()
        .take(channels)
        .map(|&s| s as f32)
        .collect();
    let offsets: Vec<i16> = (0..channels)
        .map(|i| match state.analog_format {
            AnalogFormat::Signed => state.analog_offset(i) as i16,
            AnalogFormat::Unsigned => state.analog_offset(i) as u16 as i16,
        })
        .collect();
    let gains: Vec<i16> = acq.analogs.iter().map(|a| a.gain.code()).collect();
    analog.split_and_create_children("LABELS", &labels)?;
    analog.split_and_create_children("DESCRIPTIONS", &descriptions)?;
    analog.create_or_replace_child("GEN_SCALE", Value::float(state.analog_universal_scale as f32));
    analog.split_and_create_children("SCALE", &scales)?;
    analog.split_and_create_children("OFFSET", &offsets)?;
    analog.split_and_create_children("UNITS", &units)?;
    analog.split_and_create_children("GAIN", &gains)?;
    analog.create_or_replace_child("RATE", Value::float(acq.analog_frequency() as f32));
    analog.create_or_replace_child("FORMAT", Value::string(state.analog_format.as_parameter()));
    analog.create_or_replace_child("BITS", Value::int16(i16::from(acq.analog_resolution)));

    if root.find_child("FORCE_PLATFORM").is_none() {
        let fp = root.ensure_group("FORCE_PLATFORM", "Force platforms parameters");
        fp.create_or_replace_child("USED", Value::int16(0));
        fp.create_or_replace_child("TYPE", Value::int16s(Vec::new()));
        fp.create_or_replace_child("ZERO", Value::int16s(vec![1, 0]));
        fp.create_or_replace_child("CORNERS", Value::with_dims(vec![3, 4, 0], ValueData::Float32(Vec::new()))?);
        fp.create_or_replace_child("ORIGIN", Value::with_dims(vec![3, 0], ValueData::Float32(Vec::new()))?);
        fp.create_or_replace_child("CHANNEL", Value::with_dims(vec![6, 0], ValueData::Int16(Vec::new()))?);
        fp.create_or_replace_child("CAL_MATRIX", Value::with_dims(vec![6, 6, 0], ValueData::Float32(Vec::new()))?);
    }

    write_trial_range(acq, root)?;
    write_events(acq, root)
}

/// TRIAL:ACTUAL_START_FIELD / ACTUAL_END_FIELD as two 16-bit words, lsb first.
fn write_trial_range(acq: &Acquisition, root: &mut MetadataNode) -> Result<()> {
    let split = |frame: usize| -> Result<Value> {
        let frame = u32::try_from(frame)
            .map_err(|_| CodecError::layout_overflow("frame index", frame, u32::MAX as usize))?;
        Ok(Value::int16s(vec![(frame & 0xFFFF) as u16 as i16, (frame >> 16) as u16 as i16]))
    };
    let start = split(acq.first_frame)?;
    let end = split(acq.last_frame())?;
    let trial = root.ensure_group("TRIAL", "");
    trial.create_or_replace_child("ACTUAL_START_FIELD", start);
    trial.create_or_replace_child("ACTUAL_END_FIELD", end);
    Ok(())
}

fn write_events(acq: &Acquisition, root: &mut MetadataNode) -> Result<()> {
    if acq.events.is_empty() {
        root.remove_child("EVENT");
        return Ok(());
    }
    let events = &acq.events;
    let group = root.ensure_group("EVENT", "Event parameters");
    group.create_or_replace_child("USED", Value::int16(events.len() as i16));
    let labels: Vec<String> = events.iter().map(|e| e.label.clone()).collect();
    let descriptions: Vec<String> = events.iter().map(|e| e.description.clone()).collect();
    let subjects: Vec<String> = events.iter().map(|e| e.subject.clone()).collect();
    let contexts: Vec<String> = events.iter().map(|e| e.context.clone()).collect();
    group.split_and_create_children("LABELS", &labels)?;
    group.split_and_create_children("DESCRIPTIONS", &descriptions)?;
    group.split_and_create_children("SUBJECTS", &subjects)?;
    group.split_and_create_children("CONTEXTS", &contexts)?;
    let times: Vec<f32> = events
        .iter()
        .flat_map(|e| {
            let minutes = (e.time / 60.0).floor();
            [minutes as f32, (e.time - 60.0 * minutes) as f32]
        })
        .collect();
    group.split_and_create_children_2d("TIMES", &times, 2)?;
    let icons: Vec<i16> = events.iter().map(|e| e.id as i16).collect();
    group.split_and_create_children("ICON_IDS", &icons)?;
    group.split_and_create_children("GENERIC_FLAGS", &vec![0i16; events.len()])?;

    let contexts: Vec<String> = contexts.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    let context = root.ensure_group("EVENT_CONTEXT", "Event context parameters");
    context.create_or_replace_child("USED", Value::int16(contexts.len() as i16));
    let icons: Vec<i16> = (0..contexts.len()).map(|i| i as i16).collect();
    context.split_and_create_children("ICON_IDS", &icons)?;
    context.split_and_create_children("LABELS", &contexts)?;
    context.split_and_create_children("DESCRIPTIONS", &vec![String::new(); contexts.len()])?;
    context.split_and_create_children_2d("COLOURS", &vec![0i16; 3 * contexts.len()], 3)?;
    Ok(())
}

fn vicon_compatibility(
    acq: &Acquisition,
    root: &mut MetadataNode,
    point_frequency: f64,
) -> Result<f64> {
    let frequency = if point_frequency == 0.0 {
        if let Some(point) = root.find_child_mut("POINT") {
            point.create_or_replace_child("RATE", Value::float(1.0));
        }
        1.0
    } else {
        point_frequency
    };

    for (label, count) in [("POINT", acq.points.len()), ("ANALOG", acq.analogs.len())] {
        let group = root.ensure_group(label, "");
        let mut descriptions: Vec<String> =
            group.collapse_children_values("DESCRIPTIONS", None, String::new());
        descriptions.resize(count, String::new());
        for d in &mut descriptions {
            if d.trim().is_empty() {
                *d = " ".to_string();
            }
        }
        group.split_and_create_children("DESCRIPTIONS", &descriptions)?;
    }

    let analysis = root.ensure_group("ANALYSIS", "");
    analysis.create_child_if_missing("USED", Value::int16(0));
    for name in ["DESCRIPTIONS", "SUBJECTS"] {
        let blank = analysis
            .find_child(name)
            .and_then(|n| n.value.as_ref())
            .map_or(true, |v| v.to_strings().iter().all(|s| s.trim().is_empty()));
        if blank {
            analysis.create_or_replace_child(name, Value::strings([" "]));
        }
    }
    Ok(frequency)
}
