// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-memory acquisition: points, analog channels, events and metadata.
//!
//! This is the object the C3D codec reads into and writes from. It only
//! carries what the container encodes; no biomechanical meaning is attached
//! to the samples.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{CodecError, Result};
use super::metadata::MetadataNode;

/// Label prefix given to unnamed points and channels.
pub const UNNAMED_PREFIX: &str = "uname*";

/// Default analog resolution in bits.
pub const DEFAULT_ANALOG_RESOLUTION: u8 = 12;

/// Kind of quantity stored in a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointType {
    #[default]
    Marker,
    Angle,
    Force,
    Moment,
    Power,
    Scalar,
}

impl PointType {
    /// All non-marker types with the POINT parameter that lists them.
    pub const TYPED: [(PointType, &'static str); 5] = [
        (PointType::Angle, "ANGLES"),
        (PointType::Force, "FORCES"),
        (PointType::Moment, "MOMENTS"),
        (PointType::Power, "POWERS"),
        (PointType::Scalar, "SCALARS"),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PointType::Marker => "marker",
            PointType::Angle => "angle",
            PointType::Force => "force",
            PointType::Moment => "moment",
            PointType::Power => "power",
            PointType::Scalar => "scalar",
        }
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 3D trajectory with one residual per frame.
///
/// A negative residual marks the frame as invalid (occluded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub label: String,
    pub description: String,
    pub point_type: PointType,
    pub values: Vec<[f64; 3]>,
    pub residuals: Vec<f64>,
}

impl Point {
    /// Create a point with `frames` zeroed, valid samples.
    pub fn new(label: impl Into<String>, frames: usize) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            point_type: PointType::Marker,
            values: vec![[0.0; 3]; frames],
            residuals: vec![0.0; frames],
        }
    }

    pub fn with_type(mut self, point_type: PointType) -> Self {
        self.point_type = point_type;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.values.len()
    }

    pub fn is_valid(&self, frame: usize) -> bool {
        self.residuals.get(frame).is_some_and(|&r| r >= 0.0)
    }

    fn resize(&mut self, frames: usize) {
        self.values.resize(frames, [0.0; 3]);
        self.residuals.resize(frames, -1.0);
    }
}

/// Analog input range of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnalogGain {
    #[default]
    Unknown,
    PlusMinus10,
    PlusMinus5,
    PlusMinus2Dot5,
    PlusMinus1Dot25,
    PlusMinus1,
}

impl AnalogGain {
    /// Decode an ANALOG:GAIN code; `None` for unsupported codes.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(AnalogGain::Unknown),
            1 => Some(AnalogGain::PlusMinus10),
            2 => Some(AnalogGain::PlusMinus5),
            3 => Some(AnalogGain::PlusMinus2Dot5),
            4 => Some(AnalogGain::PlusMinus1Dot25),
            5 => Some(AnalogGain::PlusMinus1),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            AnalogGain::Unknown => 0,
            AnalogGain::PlusMinus10 => 1,
            AnalogGain::PlusMinus5 => 2,
            AnalogGain::PlusMinus2Dot5 => 3,
            AnalogGain::PlusMinus1Dot25 => 4,
            AnalogGain::PlusMinus1 => 5,
        }
    }
}

/// A sampled analog channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analog {
    pub label: String,
    pub description: String,
    pub unit: String,
    pub values: Vec<f64>,
    /// Combined channel and universal scale
    pub scale: f64,
    /// Zero offset on the raw integer side
    pub offset: i32,
    pub gain: AnalogGain,
}

impl Analog {
    /// Create a channel with `samples` zeroed samples.
    pub fn new(label: impl Into<String>, samples: usize) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            unit: "V".to_string(),
            values: vec![0.0; samples],
            scale: 1.0,
            offset: 0,
            gain: AnalogGain::Unknown,
        }
    }
}

/// A labelled instant of the acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub label: String,
    /// Time in seconds
    pub time: f64,
    pub context: String,
    pub subject: String,
    pub description: String,
    /// Icon identifier
    pub id: i32,
}

impl Event {
    pub fn new(label: impl Into<String>, time: f64) -> Self {
        Self {
            label: label.into(),
            time,
            context: String::new(),
            subject: String::new(),
            description: String::new(),
            id: 0,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Units attached to each point type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointUnits {
    pub marker: String,
    pub angle: String,
    pub force: String,
    pub moment: String,
    pub power: String,
    pub scalar: String,
}

impl Default for PointUnits {
    fn default() -> Self {
        Self {
            marker: "mm".to_string(),
            angle: "deg".to_string(),
            force: "N".to_string(),
            moment: "Nmm".to_string(),
            power: "W".to_string(),
            scalar: String::new(),
        }
    }
}

impl PointUnits {
    pub fn get(&self, point_type: PointType) -> &str {
        match point_type {
            PointType::Marker => &self.marker,
            PointType::Angle => &self.angle,
            PointType::Force => &self.force,
            PointType::Moment => &self.moment,
            PointType::Power => &self.power,
            PointType::Scalar => &self.scalar,
        }
    }

    pub fn set(&mut self, point_type: PointType, unit: impl Into<String>) {
        let slot = match point_type {
            PointType::Marker => &mut self.marker,
            PointType::Angle => &mut self.angle,
            PointType::Force => &mut self.force,
            PointType::Moment => &mut self.moment,
            PointType::Power => &mut self.power,
            PointType::Scalar => &mut self.scalar,
        };
        *slot = unit.into();
    }
}

/// A complete acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acquisition {
    /// Index of the first frame (1-based)
    pub first_frame: usize,
    /// Point sampling rate in Hz
    pub point_frequency: f64,
    /// Analog samples per point frame (>= 1)
    pub analog_samples_per_frame: usize,
    pub max_interpolation_gap: u16,
    /// Analog resolution in bits
    pub analog_resolution: u8,
    pub units: PointUnits,
    pub points: Vec<Point>,
    pub analogs: Vec<Analog>,
    pub events: Vec<Event>,
    pub metadata: MetadataNode,
    frame_count: usize,
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::new()
    }
}

impl Acquisition {
    /// Create an empty acquisition.
    pub fn new() -> Self {
        Self {
            first_frame: 1,
            point_frequency: 0.0,
            analog_samples_per_frame: 1,
            max_interpolation_gap: 0,
            analog_resolution: DEFAULT_ANALOG_RESOLUTION,
            units: PointUnits::default(),
            points: Vec::new(),
            analogs: Vec::new(),
            events: Vec::new(),
            metadata: MetadataNode::root(),
            frame_count: 0,
        }
    }

    /// Reset to an empty acquisition.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Allocate `points` unnamed points and `analogs` unnamed channels for
    /// `frames` frames, replacing existing ones.
    pub fn init(&mut self, points: usize, frames: usize, analogs: usize, samples_per_frame: usize) {
        let spf = samples_per_frame.max(1);
        self.frame_count = frames;
        self.analog_samples_per_frame = spf;
        self.points = (0..points)
            .map(|i| Point::new(format!("{UNNAMED_PREFIX}{}", i + 1), frames))
            .collect();
        self.analogs = (0..analogs)
            .map(|i| Analog::new(format!("{UNNAMED_PREFIX}{}", i + 1), frames * spf))
            .collect();
    }

    /// Number of point frames.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Change the number of frames; new samples are invalid.
    pub fn resize(&mut self, frames: usize) {
        self.frame_count = frames;
        for p in &mut self.points {
            p.resize(frames);
        }
        let samples = frames * self.analog_samples_per_frame;
        for a in &mut self.analogs {
            a.values.resize(samples, 0.0);
        }
    }

    /// Index of the last frame; `first_frame - 1` when empty.
    pub fn last_frame(&self) -> usize {
        (self.first_frame + self.frame_count).saturating_sub(1)
    }

    /// Number of analog samples per channel.
    pub fn analog_frame_count(&self) -> usize {
        self.frame_count * self.analog_samples_per_frame
    }

    pub fn analog_frequency(&self) -> f64 {
        self.point_frequency * self.analog_samples_per_frame as f64
    }

    /// Duration in seconds; 0 when the frequency is unknown.
    pub fn duration(&self) -> f64 {
        if self.point_frequency > 0.0 {
            self.frame_count as f64 / self.point_frequency
        } else {
            0.0
        }
    }

    /// Append a point; it must span the acquisition frames.
    pub fn add_point(&mut self, point: Point) -> Result<()> {
        if point.values.len() != self.frame_count || point.residuals.len() != self.frame_count {
            return Err(CodecError::malformed(
                "point frames",
                format!(
                    "point '{}' has {} frames, acquisition has {}",
                    point.label,
                    point.values.len(),
                    self.frame_count
                ),
            ));
        }
        self.points.push(point);
        Ok(())
    }

    /// Append an analog channel; it must span the acquisition samples.
    pub fn add_analog(&mut self, analog: Analog) -> Result<()> {
        if analog.values.len() != self.analog_frame_count() {
            return Err(CodecError::malformed(
                "analog samples",
                format!(
                    "channel '{}' has {} samples, acquisition has {}",
                    analog.label,
                    analog.values.len(),
                    self.analog_frame_count()
                ),
            ));
        }
        self.analogs.push(analog);
        Ok(())
    }

    pub fn point(&self, label: &str) -> Option<&Point> {
        self.points.iter().find(|p| p.label == label)
    }

    pub fn analog(&self, label: &str) -> Option<&Analog> {
        self.analogs.iter().find(|a| a.label == label)
    }

    /// Check that every point and channel spans the acquisition.
    pub fn validate(&self) -> Result<()> {
        if self.analog_samples_per_frame == 0 {
            return Err(CodecError::malformed(
                "analog samples per frame",
                "must be at least 1",
            ));
        }
        for p in &self.points {
            if p.values.len() != self.frame_count || p.residuals.len() != self.frame_count {
                return Err(CodecError::malformed(
                    "point frames",
                    format!(
                        "point '{}' has {} frames, acquisition has {}",
                        p.label,
                        p.values.len(),
                        self.frame_count
                    ),
                ));
            }
        }
        let samples = self.analog_frame_count();
        for a in &self.analogs {
            if a.values.len() != samples {
                return Err(CodecError::malformed(
                    "analog samples",
                    format!(
                        "channel '{}' has {} samples, acquisition has {samples}",
                        a.label,
                        a.values.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}
