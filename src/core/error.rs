// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for c3dcodec.
//!
//! Provides error types for C3D I/O operations:
//! - Container structure violations (header, parameter section, layout)
//! - Truncated input detected by the byte stream
//! - Layout overflow while serializing
//! - Underlying resource failures

use std::fmt;

use crate::encoding::stream::StreamError;

/// Errors that can occur while reading or writing a C3D file.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Structural violation that prevents establishing a consistent layout
    MalformedContainer {
        /// Offending field (e.g. "header key", "point scale")
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Parameter whose linking ID does not match any group
    ///
    /// Readers recover from this by discarding the parameter; the variant
    /// exists so the diagnostic can be logged with structured fields.
    UnresolvedReference {
        /// Parameter label
        label: String,
        /// Linking ID carried by the parameter
        id: i8,
    },

    /// Stream hit the end of the resource in the middle of a structure
    TruncatedInput {
        /// Requested bytes
        requested: usize,
        /// Available bytes
        available: usize,
        /// Read cursor position when the error occurred
        position: u64,
    },

    /// A section does not fit the limits imposed by the container
    LayoutOverflow {
        /// Section name
        section: String,
        /// Amount required
        required: usize,
        /// Maximum allowed
        limit: usize,
    },

    /// Underlying resource open/seek/read/write error
    IoFailure {
        /// Human readable cause
        cause: String,
    },
}

impl CodecError {
    /// Create a malformed container error.
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::MalformedContainer {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an unresolved reference diagnostic.
    pub fn unresolved_reference(label: impl Into<String>, id: i8) -> Self {
        CodecError::UnresolvedReference {
            label: label.into(),
            id,
        }
    }

    /// Create a truncated input error.
    pub fn truncated(requested: usize, available: usize, position: u64) -> Self {
        CodecError::TruncatedInput {
            requested,
            available,
            position,
        }
    }

    /// Create a layout overflow error.
    pub fn layout_overflow(section: impl Into<String>, required: usize, limit: usize) -> Self {
        CodecError::LayoutOverflow {
            section: section.into(),
            required,
            limit,
        }
    }

    /// Create an I/O failure.
    pub fn io(cause: impl Into<String>) -> Self {
        CodecError::IoFailure {
            cause: cause.into(),
        }
    }

    /// Whether the error is a recovered diagnostic rather than a failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CodecError::UnresolvedReference { .. })
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            CodecError::MalformedContainer { field, reason } => {
                vec![("field", field.clone()), ("reason", reason.clone())]
            }
            CodecError::UnresolvedReference { label, id } => {
                vec![("label", label.clone()), ("id", id.to_string())]
            }
            CodecError::TruncatedInput {
                requested,
                available,
                position,
            } => vec![
                ("requested", requested.to_string()),
                ("available", available.to_string()),
                ("position", position.to_string()),
            ],
            CodecError::LayoutOverflow {
                section,
                required,
                limit,
            } => vec![
                ("section", section.clone()),
                ("required", required.to_string()),
                ("limit", limit.to_string()),
            ],
            CodecError::IoFailure { cause } => vec![("cause", cause.clone())],
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MalformedContainer { field, reason } => {
                write!(f, "Malformed container, invalid {field}: {reason}")
            }
            CodecError::UnresolvedReference { label, id } => write!(
                f,
                "Unresolved reference: parameter '{label}' points to missing group {}",
                -(i16::from(*id).abs())
            ),
            CodecError::TruncatedInput {
                requested,
                available,
                position,
            } => write!(
                f,
                "Truncated input: requested {requested} bytes at position {position}, but only {available} bytes available"
            ),
            CodecError::LayoutOverflow {
                section,
                required,
                limit,
            } => write!(
                f,
                "Layout overflow in {section}: {required} required, limit is {limit}"
            ),
            CodecError::IoFailure { cause } => write!(f, "I/O failure: {cause}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::from(StreamError::from(err))
    }
}

impl From<StreamError> for CodecError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::EndOfResource {
                requested,
                available,
                position,
            } => CodecError::TruncatedInput {
                requested,
                available,
                position,
            },
            StreamError::ReadFailure(cause) | StreamError::IntegrityFailure(cause) => {
                CodecError::IoFailure { cause }
            }
        }
    }
}

/// Result type for c3dcodec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
