// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use c3dcodec::encoding::{ByteOrder, ByteStream, SeekOrigin};
use c3dcodec::{Acquisition, Analog, Event, Point, PointType};

// ============================================================================
// Synthetic Acquisitions
// ============================================================================

/// Build an acquisition with deterministic trajectories and analog ramps.
///
/// Every fifth frame of the first point is occluded.
pub fn synthetic_acquisition(points: usize, frames: usize, analogs: usize, spf: usize) -> Acquisition {
    let mut acq = Acquisition::new();
    acq.init(0, frames, 0, spf);
    acq.point_frequency = 100.0;

    for p in 0..points {
        let mut point = Point::new(format!("M{p:02}"), frames);
        point.description = format!("Marker {p}");
        for f in 0..frames {
            let t = f as f64 / 10.0;
            point.values[f] = [
                100.0 * (t + p as f64).sin(),
                250.0 + 10.0 * p as f64 - t,
                -40.0 * (t * 0.5).cos(),
            ];
            point.residuals[f] = if p == 0 && f % 5 == 4 { -1.0 } else { 0.5 };
        }
        if p == points.saturating_sub(1) && points > 1 {
            point = point.with_type(PointType::Angle);
        }
        acq.add_point(point).unwrap();
    }

    for a in 0..analogs {
        let mut analog = Analog::new(format!("CH{}", a + 1), frames * spf);
        analog.unit = "N".to_string();
        analog.description = format!("Channel {}", a + 1);
        for (i, v) in analog.values.iter_mut().enumerate() {
            *v = ((i as f64) * 0.7 + a as f64 * 3.0).sin() * 200.0;
        }
        acq.add_analog(analog).unwrap();
    }

    acq.events = vec![
        Event::new("Foot Strike", 0.25).with_context("Left"),
        Event::new("Foot Off", 0.61).with_context("Right"),
    ];
    acq
}

/// Largest coordinate error allowed for a point written with `scale`.
pub fn point_tolerance(scale: f64) -> f64 {
    scale.abs() / 2.0 + 1e-6
}

// ============================================================================
// Hand-Assembled C3D Files
// ============================================================================

/// One raw parameter section entry.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub id: i8,
    pub label: String,
    pub locked: bool,
    /// Type code, dimensions and data; `None` for groups
    pub value: Option<(i8, Vec<u8>, Vec<u8>)>,
    pub description: String,
}

/// Builder for C3D files assembled byte by byte.
///
/// Entries are written in insertion order with forward offsets; header
/// fields and the data section are set directly.
pub struct C3dBuilder {
    pub order: ByteOrder,
    pub with_header: bool,
    pub processor_type: u8,
    pub point_count: u16,
    pub analog_total: u16,
    pub first_frame: u16,
    pub last_frame: u16,
    pub point_scale: f32,
    pub analog_per_frame: u16,
    pub frame_rate: f32,
    /// Overrides the computed data first block
    pub data_first_block: Option<u16>,
    /// Overrides the computed parameter block count
    pub declared_blocks: Option<u8>,
    pub header_events: Vec<(String, f32)>,
    pub entries: Vec<RawEntry>,
    data: ByteStream<Vec<u8>>,
}

impl C3dBuilder {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            with_header: true,
            processor_type: order.processor_type() as u8,
            point_count: 0,
            analog_total: 0,
            first_frame: 1,
            last_frame: 0,
            point_scale: 0.1,
            analog_per_frame: 1,
            frame_rate: 100.0,
            data_first_block: None,
            declared_blocks: None,
            header_events: Vec::new(),
            entries: Vec::new(),
            data: ByteStream::writer(order),
        }
    }

    pub fn group(mut self, id: i8, label: &str) -> Self {
        self.entries.push(RawEntry {
            id,
            label: label.to_string(),
            locked: false,
            value: None,
            description: String::new(),
        });
        self
    }

    fn parameter(mut self, id: i8, label: &str, code: i8, dims: Vec<u8>, data: Vec<u8>) -> Self {
        self.entries.push(RawEntry {
            id,
            label: label.to_string(),
            locked: false,
            value: Some((code, dims, data)),
            description: String::new(),
        });
        self
    }

    pub fn int16s(self, id: i8, label: &str, values: &[i16]) -> Self {
        let mut out = ByteStream::writer(self.order);
        for &v in values {
            out.write_i16(v);
        }
        let dims = if values.len() == 1 {
            Vec::new()
        } else {
            vec![values.len() as u8]
        };
        self.parameter(id, label, 2, dims, out.into_inner())
    }

    pub fn floats(self, id: i8, label: &str, values: &[f32]) -> Self {
        let mut out = ByteStream::writer(self.order);
        for &v in values {
            out.write_f32(v);
        }
        let dims = if values.len() == 1 {
            Vec::new()
        } else {
            vec![values.len() as u8]
        };
        self.parameter(id, label, 4, dims, out.into_inner())
    }

    pub fn floats_shaped(self, id: i8, label: &str, values: &[f32], dims: &[u8]) -> Self {
        let mut out = ByteStream::writer(self.order);
        for &v in values {
            out.write_f32(v);
        }
        self.parameter(id, label, 4, dims.to_vec(), out.into_inner())
    }

    pub fn string(self, id: i8, label: &str, value: &str) -> Self {
        self.parameter(id, label, -1, vec![value.len() as u8], value.as_bytes().to_vec())
    }

    pub fn strings(self, id: i8, label: &str, values: &[&str]) -> Self {
        let width = values.iter().map(|s| s.len()).max().unwrap_or(0);
        let mut out = ByteStream::writer(self.order);
        for v in values {
            out.write_string(v, width);
        }
        self.parameter(
            id,
            label,
            -1,
            vec![width as u8, values.len() as u8],
            out.into_inner(),
        )
    }

    /// Append a raw entry, e.g. one with an unknown type code.
    pub fn raw(mut self, entry: RawEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn sample_i16(&mut self, v: i16) {
        self.data.write_i16(v);
    }

    pub fn sample_u16(&mut self, v: u16) {
        self.data.write_u16(v);
    }

    pub fn sample_f32(&mut self, v: f32) {
        self.data.write_f32(v);
    }

    pub fn sample_bytes(&mut self, bytes: &[u8]) {
        self.data.write_bytes(bytes);
    }

    /// First block of the parameter section.
    pub fn parameter_block(&self) -> usize {
        if self.with_header {
            2
        } else {
            1
        }
    }

    pub fn build(self) -> Vec<u8> {
        let first_block = self.parameter_block();
        let start = 512 * (first_block - 1);

        let mut out = ByteStream::writer(self.order);
        out.seek_write(start as i64, SeekOrigin::Begin).unwrap();
        out.write_u8(first_block as u8);
        out.write_u8(0x50);
        out.write_u8(0);
        out.write_u8(self.processor_type);

        for entry in &self.entries {
            let name_len = entry.label.len() as i8;
            out.write_i8(if entry.locked { -name_len } else { name_len });
            out.write_i8(entry.id);
            out.write_bytes(entry.label.as_bytes());
            let next_field = out.write_position();
            out.write_u16(0);
            if let Some((code, dims, data)) = &entry.value {
                out.write_i8(*code);
                out.write_u8(dims.len() as u8);
                out.write_bytes(dims);
                out.write_bytes(data);
            }
            out.write_u8(entry.description.len() as u8);
            out.write_bytes(entry.description.as_bytes());
            let end = out.write_position();
            out.seek_write(next_field as i64, SeekOrigin::Begin).unwrap();
            out.write_u16((end - next_field) as u16);
            out.seek_write(end as i64, SeekOrigin::Begin).unwrap();
        }
        out.write_u8(0);
        out.write_u8(0);

        let section = out.write_position() - start;
        let blocks = section.div_ceil(512);
        out.fill(0, blocks * 512 - section);
        out.seek_write((start + 2) as i64, SeekOrigin::Begin).unwrap();
        out.write_u8(self.declared_blocks.unwrap_or(blocks as u8));

        let data_block = self
            .data_first_block
            .unwrap_or((first_block + blocks) as u16);
        if self.with_header {
            out.seek_write(0, SeekOrigin::Begin).unwrap();
            out.write_u8(first_block as u8);
            out.write_u8(0x50);
            out.write_u16(self.point_count);
            out.write_u16(self.analog_total);
            out.write_u16(self.first_frame);
            out.write_u16(self.last_frame);
            out.write_u16(0);
            out.write_f32(self.point_scale);
            out.write_u16(data_block);
            out.write_u16(self.analog_per_frame);
            out.write_f32(self.frame_rate);

            out.seek_write(298, SeekOrigin::Begin).unwrap();
            out.write_i16(12345);
            out.write_i16(self.header_events.len() as i16);
            out.write_u16(0);
            for slot in 0..18 {
                out.write_f32(self.header_events.get(slot).map_or(0.0, |e| e.1));
            }
            for slot in 0..18 {
                out.write_u8(u8::from(slot < self.header_events.len()));
            }
            out.write_u16(0);
            for slot in 0..18 {
                out.write_string(self.header_events.get(slot).map_or("", |e| e.0.as_str()), 4);
            }
        }

        let data = self.data.into_inner();
        if !data.is_empty() {
            let offset = 512 * (usize::from(data_block) - 1);
            out.seek_write(offset as i64, SeekOrigin::Begin).unwrap();
            out.write_bytes(&data);
        }
        out.into_inner()
    }
}

/// Little-endian integer file with two points over three frames, one
/// analog channel sampled twice per frame and the usual POINT/ANALOG
/// groups.
pub fn basic_integer_file() -> C3dBuilder {
    let mut builder = C3dBuilder::new(ByteOrder::IeeeLittleEndian)
        .group(-1, "POINT")
        .int16s(1, "USED", &[2])
        .floats(1, "SCALE", &[0.1])
        .floats(1, "RATE", &[100.0])
        .strings(1, "LABELS", &["LASI", "RASI"])
        .string(1, "UNITS", "mm")
        .group(-2, "ANALOG")
        .int16s(2, "USED", &[1])
        .strings(2, "LABELS", &["FZ"])
        .floats(2, "SCALE", &[0.5])
        .int16s(2, "OFFSET", &[10])
        .floats(2, "GEN_SCALE", &[2.0])
        .strings(2, "UNITS", &["N"])
        .floats(2, "RATE", &[200.0]);
    builder.point_count = 2;
    builder.analog_total = 2;
    builder.analog_per_frame = 2;
    builder.first_frame = 1;
    builder.last_frame = 3;

    for frame in 0..3i16 {
        for point in 0..2i16 {
            builder.sample_i16(100 * (point + 1) + frame);
            builder.sample_i16(-200);
            builder.sample_i16(50);
            builder.sample_bytes(&[5, 0]);
        }
        builder.sample_i16(10 + frame);
        builder.sample_i16(20 + frame);
    }
    builder
}
