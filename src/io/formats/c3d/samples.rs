// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D data section codec.
//!
//! Each point frame is stored as one record:
//!
//! ```text
//! [x y z word] x point count, then [analog] x (samples per frame x channels)
//! ```
//!
//! Analog samples of a frame are interleaved: channel 0 sample 0, channel 1
//! sample 0, ..., channel 0 sample 1, ... The fourth point word packs the
//! camera mask (high byte) and the residual (low byte); a negative high
//! byte marks the sample as invalid.

use tracing::warn;

use crate::encoding::ByteStream;
use crate::{Acquisition, Result};

use super::constants::MOTION_ANALYSIS_OCCLUSION;
use super::state::{AnalogFormat, StorageFormat};

/// Sample encoding selected by storage format and analog signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleCodec {
    IntegerSigned,
    IntegerUnsigned,
    FloatSigned,
    FloatUnsigned,
}

/// Scales applied while decoding or encoding samples.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleScaling {
    /// Point scale as stored in the header (negative for float storage)
    pub point_scale: f64,
    /// Combined channel and universal scale, per channel
    pub analog_scale: Vec<f64>,
    /// Raw zero offset, per channel
    pub analog_offset: Vec<i32>,
}

impl SampleScaling {
    fn analog(&self, channel: usize) -> (f64, f64) {
        (
            self.analog_scale.get(channel).copied().unwrap_or(1.0),
            f64::from(self.analog_offset.get(channel).copied().unwrap_or(0)),
        )
    }
}

impl SampleCodec {
    /// Pick the codec for a storage format and analog signedness.
    pub fn select(storage: StorageFormat, analog: AnalogFormat) -> Self {
        match (storage, analog) {
            (StorageFormat::Integer, AnalogFormat::Signed) => SampleCodec::IntegerSigned,
            (StorageFormat::Integer, AnalogFormat::Unsigned) => SampleCodec::IntegerUnsigned,
            (StorageFormat::Float, AnalogFormat::Signed) => SampleCodec::FloatSigned,
            (StorageFormat::Float, AnalogFormat::Unsigned) => SampleCodec::FloatUnsigned,
        }
    }

    pub fn storage(self) -> StorageFormat {
        match self {
            SampleCodec::IntegerSigned | SampleCodec::IntegerUnsigned => StorageFormat::Integer,
            SampleCodec::FloatSigned | SampleCodec::FloatUnsigned => StorageFormat::Float,
        }
    }

    /// Size of one stored word.
    pub fn word_size(self) -> usize {
        match self.storage() {
            StorageFormat::Integer => 2,
            StorageFormat::Float => 4,
        }
    }

    /// Size of one frame record.
    pub fn frame_size(self, points: usize, analog_samples: usize) -> usize {
        self.word_size() * (4 * points + analog_samples)
    }

    /// Decode every frame of `acq` from the read cursor.
    ///
    /// Points and channels must already be allocated. Frames past the end
    /// of the resource are left invalid and reported once. Returns the
    /// number of frames decoded.
    pub fn decode<B: AsRef<[u8]>>(
        self,
        stream: &mut ByteStream<B>,
        scaling: &SampleScaling,
        acq: &mut Acquisition,
        motion_analysis: bool,
    ) -> Result<usize> {
        let frames = acq.frame_count();
        let spf = acq.analog_samples_per_frame;
        let channels = acq.analogs.len();
        let frame_size = self.frame_size(acq.points.len(), spf * channels);
        let available = if frame_size == 0 {
            frames
        } else {
            (stream.remaining() / frame_size).min(frames)
        };
        if available < frames {
            warn!(
                expected = frames,
                found = available,
                "C3D data section is truncated; remaining samples are marked invalid"
            );
        }

        for frame in 0..available {
            for point in &mut acq.points {
                let (coords, residual) = self.read_point(stream, scaling.point_scale)?;
                if motion_analysis && coords[0] == MOTION_ANALYSIS_OCCLUSION {
                    point.values[frame] = [0.0; 3];
                    point.residuals[frame] = -1.0;
                } else {
                    point.values[frame] = coords;
                    point.residuals[frame] = residual;
                }
            }
            for sub in 0..spf {
                for (channel, analog) in acq.analogs.iter_mut().enumerate() {
                    let (scale, offset) = scaling.analog(channel);
                    let raw = self.read_analog(stream)?;
                    analog.values[frame * spf + sub] = (raw - offset) * scale;
                }
            }
        }

        for frame in available..frames {
            for point in &mut acq.points {
                point.values[frame] = [0.0; 3];
                point.residuals[frame] = -1.0;
            }
            for analog in &mut acq.analogs {
                analog.values[frame * spf..(frame + 1) * spf].fill(0.0);
            }
        }
        Ok(available)
    }

    /// Encode every frame of `acq` at the write cursor.
    pub fn encode(self, stream: &mut ByteStream<Vec<u8>>, scaling: &SampleScaling, acq: &Acquisition) {
        let spf = acq.analog_samples_per_frame;
        for frame in 0..acq.frame_count() {
            for point in &acq.points {
                self.write_point(
                    stream,
                    point.values[frame],
                    point.residuals[frame],
                    scaling.point_scale,
                );
            }
            for sub in 0..spf {
                for (channel, analog) in acq.analogs.iter().enumerate() {
                    let (scale, offset) = scaling.analog(channel);
                    let scale = if scale == 0.0 { 1.0 } else { scale };
                    self.write_analog(stream, analog.values[frame * spf + sub] / scale + offset);
                }
            }
        }
    }

    fn read_point<B: AsRef<[u8]>>(
        self,
        stream: &mut ByteStream<B>,
        scale: f64,
    ) -> Result<([f64; 3], f64)> {
        match self.storage() {
            StorageFormat::Integer => {
                let scale = scale.abs();
                let x = f64::from(stream.read_i16()?) * scale;
                let y = f64::from(stream.read_i16()?) * scale;
                let z = f64::from(stream.read_i16()?) * scale;
                let word = stream.read_i16()?;
                Ok(([x, y, z], unpack_residual(word, scale, false)))
            }
            StorageFormat::Float => {
                let x = f64::from(stream.read_f32()?);
                let y = f64::from(stream.read_f32()?);
                let z = f64::from(stream.read_f32()?);
                let word = stream.read_f32()? as i16;
                Ok(([x, y, z], unpack_residual(word, scale, true)))
            }
        }
    }

    fn read_analog<B: AsRef<[u8]>>(self, stream: &mut ByteStream<B>) -> Result<f64> {
        Ok(match self {
            SampleCodec::IntegerSigned => f64::from(stream.read_i16()?),
            SampleCodec::IntegerUnsigned => f64::from(stream.read_u16()?),
            SampleCodec::FloatSigned | SampleCodec::FloatUnsigned => f64::from(stream.read_f32()?),
        })
    }

    fn write_point(
        self,
        stream: &mut ByteStream<Vec<u8>>,
        coords: [f64; 3],
        residual: f64,
        scale: f64,
    ) {
        match self.storage() {
            StorageFormat::Integer => {
                let scale = scale.abs();
                for c in coords {
                    stream.write_i16((c / scale + 0.5).floor() as i16);
                }
                stream.write_i16(pack_residual(residual, scale));
            }
            StorageFormat::Float => {
                for c in coords {
                    stream.write_f32(c as f32);
                }
                stream.write_f32(f32::from(pack_residual(residual, scale)));
            }
        }
    }

    fn write_analog(self, stream: &mut ByteStream<Vec<u8>>, raw: f64) {
        match self {
            SampleCodec::IntegerSigned => stream.write_i16(raw.round() as i16),
            SampleCodec::IntegerUnsigned => stream.write_u16(raw.round() as u16),
            SampleCodec::FloatSigned | SampleCodec::FloatUnsigned => stream.write_f32(raw as f32),
        }
    }
}

/// Split a packed residual word into a residual.
///
/// With `absolute`, the magnitude of `low byte x scale` is taken: float
/// files written with a negative scale store a negative low byte even for
/// valid samples.
pub(crate) fn unpack_residual(word: i16, scale: f64, absolute: bool) -> f64 {
    let low = (word & 0xFF) as u8 as i8;
    let high = (word >> 8) as i8;
    if high < 0 {
        return -1.0;
    }
    let residual = f64::from(low) * scale;
    if absolute {
        residual.abs()
    } else {
        residual
    }
}

/// Pack a residual into a word; invalid samples become `0xFFFF`.
pub(crate) fn pack_residual(residual: f64, scale: f64) -> i16 {
    if residual < 0.0 {
        return -1;
    }
    let low = if scale == 0.0 {
        0
    } else {
        (residual / scale).round() as i8
    };
    i16::from(low as u8)
}
