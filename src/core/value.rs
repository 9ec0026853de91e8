// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Typed, N-dimensional parameter values.
//!
//! A C3D parameter holds a flat buffer of one element kind (character,
//! byte, 16-bit integer or 32-bit float) together with up to seven
//! dimensions. For character values the first dimension is the string
//! width and the remaining dimensions count the strings.
//!
//! Consumers frequently expect a different kind than the one stored (an
//! integer count written as a float, a scale written as an integer). Every
//! [`Value`] can therefore be viewed as any numeric element type through
//! [`Value::cast`]. The conversion rules are total and never panic:
//!
//! - integer to integer: two's complement wrapping (`as` cast)
//! - float to integer: truncation toward zero, saturating at the bounds,
//!   NaN becomes 0
//! - string to number: the trimmed text parsed as a number, 0 when it does
//!   not parse

use serde::{Deserialize, Serialize};

use super::error::{CodecError, Result};

/// Maximum number of dimensions of a parameter value.
pub const MAX_DIMENSIONS: usize = 7;

/// Largest size of a single dimension.
pub const MAX_DIMENSION_SIZE: usize = 255;

/// Element kind of a parameter value, with its on-disk type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Character data, type code -1
    Char,
    /// Signed byte, type code 1
    Byte,
    /// Signed 16-bit integer, type code 2
    Integer,
    /// 32-bit float, type code 4
    Float,
}

impl ValueKind {
    /// Decode an on-disk type code.
    pub fn from_type_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(ValueKind::Char),
            1 => Some(ValueKind::Byte),
            2 => Some(ValueKind::Integer),
            4 => Some(ValueKind::Float),
            _ => None,
        }
    }

    /// On-disk type code.
    pub fn type_code(self) -> i8 {
        match self {
            ValueKind::Char => -1,
            ValueKind::Byte => 1,
            ValueKind::Integer => 2,
            ValueKind::Float => 4,
        }
    }

    /// Size of one element in bytes.
    pub fn element_size(self) -> usize {
        self.type_code().unsigned_abs() as usize
    }
}

/// Flat element buffer of a [`Value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueData {
    /// Strings, one per element of dimensions `1..`
    String(Vec<String>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Float32(Vec<f32>),
}

impl ValueData {
    fn len(&self) -> usize {
        match self {
            ValueData::String(v) => v.len(),
            ValueData::Int8(v) => v.len(),
            ValueData::Int16(v) => v.len(),
            ValueData::Float32(v) => v.len(),
        }
    }
}

/// Numeric element type a [`Value`] can be viewed as.
pub trait Element: Copy {
    /// Convert from a stored integer (wrapping).
    fn from_i64(v: i64) -> Self;
    /// Convert from a stored float (truncating, saturating).
    fn from_f64(v: f64) -> Self;

    /// Convert from stored text.
    fn from_text(s: &str) -> Self {
        let s = s.trim();
        match s.parse::<i64>() {
            Ok(v) => Self::from_i64(v),
            Err(_) => Self::from_f64(s.parse::<f64>().unwrap_or(0.0)),
        }
    }
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline]
                fn from_i64(v: i64) -> Self {
                    v as $t
                }
                #[inline]
                fn from_f64(v: f64) -> Self {
                    v as $t
                }
            }
        )*
    };
}

impl_element!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

/// A parameter value: element buffer plus dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    dims: Vec<usize>,
    data: ValueData,
}

impl Value {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Create a value from explicit dimensions and data.
    ///
    /// Fails when the number of dimensions exceeds 7 or the element count
    /// does not match the product of the dimensions.
    pub fn with_dims(dims: Vec<usize>, data: ValueData) -> Result<Self> {
        if dims.len() > MAX_DIMENSIONS {
            return Err(CodecError::malformed(
                "value dimensions",
                format!("{} dimensions, at most {MAX_DIMENSIONS} allowed", dims.len()),
            ));
        }
        let expected = element_count(&dims, matches!(data, ValueData::String(_)));
        if data.len() != expected {
            return Err(CodecError::malformed(
                "value dimensions",
                format!("{} elements for dimensions {dims:?}", data.len()),
            ));
        }
        Ok(Self { dims, data })
    }

    /// A single string.
    pub fn string(s: impl Into<String>) -> Self {
        let s = s.into();
        Self {
            dims: vec![s.chars().count()],
            data: ValueData::String(vec![s]),
        }
    }

    /// A list of strings padded to the width of the longest one.
    pub fn strings<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        let width = items.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        Self {
            dims: vec![width, items.len()],
            data: ValueData::String(items),
        }
    }

    /// A list of strings laid out as a matrix of `shape` (outermost last).
    pub fn string_matrix<S: Into<String>>(
        items: impl IntoIterator<Item = S>,
        shape: &[usize],
    ) -> Result<Self> {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        let width = items.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        let mut dims = Vec::with_capacity(shape.len() + 1);
        dims.push(width);
        dims.extend_from_slice(shape);
        Self::with_dims(dims, ValueData::String(items))
    }

    pub fn int8(v: i8) -> Self {
        Self {
            dims: Vec::new(),
            data: ValueData::Int8(vec![v]),
        }
    }

    pub fn int16(v: i16) -> Self {
        Self {
            dims: Vec::new(),
            data: ValueData::Int16(vec![v]),
        }
    }

    pub fn float(v: f32) -> Self {
        Self {
            dims: Vec::new(),
            data: ValueData::Float32(vec![v]),
        }
    }

    pub fn int8s(v: Vec<i8>) -> Self {
        Self {
            dims: vec![v.len()],
            data: ValueData::Int8(v),
        }
    }

    pub fn int16s(v: Vec<i16>) -> Self {
        Self {
            dims: vec![v.len()],
            data: ValueData::Int16(v),
        }
    }

    pub fn floats(v: Vec<f32>) -> Self {
        Self {
            dims: vec![v.len()],
            data: ValueData::Float32(v),
        }
    }

    /// An empty value of `kind` with a zero-sized outer dimension.
    pub fn empty(kind: ValueKind) -> Self {
        let (dims, data) = match kind {
            ValueKind::Char => (vec![0, 0], ValueData::String(Vec::new())),
            ValueKind::Byte => (vec![0], ValueData::Int8(Vec::new())),
            ValueKind::Integer => (vec![0], ValueData::Int16(Vec::new())),
            ValueKind::Float => (vec![0], ValueData::Float32(Vec::new())),
        };
        Self { dims, data }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn kind(&self) -> ValueKind {
        match self.data {
            ValueData::String(_) => ValueKind::Char,
            ValueData::Int8(_) => ValueKind::Byte,
            ValueData::Int16(_) => ValueKind::Integer,
            ValueData::Float32(_) => ValueKind::Float,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    /// Number of logical elements (strings count as one element each).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    pub fn is_string(&self) -> bool {
        matches!(self.data, ValueData::String(_))
    }

    /// Width of string elements; 1 for numeric values.
    pub fn string_width(&self) -> usize {
        match (&self.data, self.dims.first()) {
            (ValueData::String(_), Some(&w)) => w,
            _ => 1,
        }
    }

    /// Size of the element buffer on disk.
    pub fn byte_size(&self) -> usize {
        match self.kind() {
            ValueKind::Char => self.string_width() * self.len(),
            kind => kind.element_size() * self.len(),
        }
    }

    /// Outermost dimension, the one split across `LABEL`, `LABEL2`, ...
    pub fn outer_dimension(&self) -> usize {
        self.dims.last().copied().unwrap_or(1)
    }

    // ========================================================================
    // Conversion views
    // ========================================================================

    /// View every element as `T`.
    pub fn cast<T: Element>(&self) -> Vec<T> {
        match &self.data {
            ValueData::String(v) => v.iter().map(|s| T::from_text(s)).collect(),
            ValueData::Int8(v) => v.iter().map(|&x| T::from_i64(i64::from(x))).collect(),
            ValueData::Int16(v) => v.iter().map(|&x| T::from_i64(i64::from(x))).collect(),
            ValueData::Float32(v) => v.iter().map(|&x| T::from_f64(f64::from(x))).collect(),
        }
    }

    /// View element `idx` as `T`.
    pub fn get<T: Element>(&self, idx: usize) -> Option<T> {
        match &self.data {
            ValueData::String(v) => v.get(idx).map(|s| T::from_text(s)),
            ValueData::Int8(v) => v.get(idx).map(|&x| T::from_i64(i64::from(x))),
            ValueData::Int16(v) => v.get(idx).map(|&x| T::from_i64(i64::from(x))),
            ValueData::Float32(v) => v.get(idx).map(|&x| T::from_f64(f64::from(x))),
        }
    }

    /// First element as `T`.
    pub fn first<T: Element>(&self) -> Option<T> {
        self.get(0)
    }

    pub fn to_f64s(&self) -> Vec<f64> {
        self.cast()
    }

    pub fn to_i64s(&self) -> Vec<i64> {
        self.cast()
    }

    /// Elements as right-trimmed strings; numbers are formatted.
    pub fn to_strings(&self) -> Vec<String> {
        match &self.data {
            ValueData::String(v) => v.iter().map(|s| s.trim_end().to_string()).collect(),
            ValueData::Int8(v) => v.iter().map(|x| x.to_string()).collect(),
            ValueData::Int16(v) => v.iter().map(|x| x.to_string()).collect(),
            ValueData::Float32(v) => v.iter().map(|x| x.to_string()).collect(),
        }
    }

    /// First element as a trimmed string.
    pub fn first_string(&self) -> Option<String> {
        self.to_strings().into_iter().next()
    }
}

/// Number of elements implied by `dims`.
///
/// For strings the first dimension is the width and does not count.
pub fn element_count(dims: &[usize], string: bool) -> usize {
    match (string, dims.split_first()) {
        (_, None) => 1,
        (true, Some((_, rest))) => rest.iter().product(),
        (false, Some(_)) => dims.iter().product(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        for kind in [
            ValueKind::Char,
            ValueKind::Byte,
            ValueKind::Integer,
            ValueKind::Float,
        ] {
            assert_eq!(ValueKind::from_type_code(kind.type_code()), Some(kind));
        }
        assert_eq!(ValueKind::from_type_code(3), None);
        assert_eq!(ValueKind::Float.element_size(), 4);
        assert_eq!(ValueKind::Char.element_size(), 1);
    }

    #[test]
    fn test_with_dims_checks_count() {
        let ok = Value::with_dims(vec![2, 3], ValueData::Int16(vec![0; 6]));
        assert!(ok.is_ok());
        let bad = Value::with_dims(vec![2, 3], ValueData::Int16(vec![0; 5]));
        assert!(matches!(bad, Err(CodecError::MalformedContainer { .. })));
        let too_deep = Value::with_dims(vec![1; 8], ValueData::Int8(vec![0]));
        assert!(too_deep.is_err());
    }

    #[test]
    fn test_zero_sized_value() {
        let v = Value::with_dims(vec![3, 0], ValueData::Float32(Vec::new())).unwrap();
        assert!(v.is_empty());
        assert_eq!(v.byte_size(), 0);
        assert_eq!(v.outer_dimension(), 0);
    }

    #[test]
    fn test_string_dims() {
        let v = Value::strings(["LASI", "RASIS", ""]);
        assert_eq!(v.dims(), &[5, 3]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.byte_size(), 15);
        assert_eq!(v.kind(), ValueKind::Char);

        let scalar = Value::string("mm");
        assert_eq!(scalar.dims(), &[2]);
        assert_eq!(scalar.len(), 1);
    }

    #[test]
    fn test_float_to_integer_truncates_and_saturates() {
        let v = Value::floats(vec![2.9, -2.9, 1e10, f32::NAN]);
        assert_eq!(v.cast::<i16>(), vec![2, -2, i16::MAX, 0]);
    }

    #[test]
    fn test_integer_to_integer_wraps() {
        let v = Value::int16s(vec![-1, 300]);
        assert_eq!(v.cast::<u16>(), vec![65535, 300]);
        assert_eq!(v.cast::<i8>(), vec![-1, 44]);
    }

    #[test]
    fn test_string_to_number() {
        let v = Value::strings(["  12 ", "3.5", "abc"]);
        assert_eq!(v.cast::<i32>(), vec![12, 3, 0]);
        assert_eq!(v.cast::<f64>(), vec![12.0, 3.5, 0.0]);
    }

    #[test]
    fn test_get_out_of_range() {
        let v = Value::int8(4);
        assert_eq!(v.get::<f32>(0), Some(4.0));
        assert_eq!(v.get::<f32>(1), None);
    }

    #[test]
    fn test_to_strings_trims() {
        let v = Value::with_dims(
            vec![4, 2],
            ValueData::String(vec!["AB  ".to_string(), "C   ".to_string()]),
        )
        .unwrap();
        assert_eq!(v.to_strings(), vec!["AB", "C"]);
        assert_eq!(Value::float(0.5).first_string().as_deref(), Some("0.5"));
    }
}
