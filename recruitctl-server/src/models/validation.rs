//! Validation error types

use std::fmt;
use uuid::Uuid;

/// Validation error for request payloads and write invariants
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., email)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Number outside its accepted range
    OutOfRange { field: &'static str, min: f64, max: f64 },

    /// Referenced row is missing or soft-deleted
    UnknownReference { field: &'static str, id: Uuid },

    /// A live row already holds this combination of values
    Duplicate {
        resource: &'static str,
        fields: &'static [&'static str],
    },

    /// Patch with no fields set
    NoChanges,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::OutOfRange { field, min, max } => {
                write!(f, "{} must be between {} and {}", field, min, max)
            }
            Self::UnknownReference { field, id } => {
                write!(f, "{} '{}' does not exist", field, id)
            }
            Self::Duplicate { resource, fields } => {
                write!(f, "{} already exists for this {}", resource, fields.join(", "))
            }
            Self::NoChanges => write!(f, "no fields to update"),
        }
    }
}

impl std::error::Error for ValidationError {}
