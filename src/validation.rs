//! Structural validation errors for service record payloads.
//!
//! Only field presence, field types, simple formats and ranges are checked.
//! Relations between fields (exit after entry, growing odometer readings) are
//! deliberately left alone.

use thiserror::Error;

/// Youngest accepted patient age.
pub const MIN_AGE: i64 = 0;

/// Oldest accepted patient age.
pub const MAX_AGE: i64 = 120;

/// Every field a payload must carry, as dotted paths.
pub const REQUIRED_FIELDS: &[&str] = &[
    "date",
    "time",
    "timestamps.entry",
    "timestamps.exit",
    "timestamps.arrival",
    "kilometers.entry",
    "kilometers.exit",
    "kilometers.arrival",
    "service_type",
    "diagnostic",
    "patient.name",
    "patient.age",
    "patient.sex",
    "patient.address",
    "patient.medical_history",
];

/// What went wrong with a single field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationErrorKind {
    /// The payload is not a JSON document at all.
    #[error("payload is not valid JSON: {0}")]
    Malformed(String),

    /// The field is absent or null.
    #[error("missing field")]
    Missing,

    /// The field holds a value of the wrong JSON type.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// A date or time string does not follow the expected layout.
    #[error("expected {expected}, got `{value}`")]
    InvalidFormat {
        /// Human readable description of the accepted layout.
        expected: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A number is not finite or falls below zero.
    #[error("expected a non-negative number, got `{value}`")]
    Negative {
        /// The rejected input.
        value: String,
    },

    /// An integer lies outside its inclusive range.
    #[error("`{value}` is outside the allowed range {min}..={max}")]
    OutOfRange {
        /// The rejected input.
        value: String,
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },

    /// A choice field holds a label outside its closed set.
    #[error("`{value}` is not one of: {}", allowed.join(", "))]
    UnknownLabel {
        /// The rejected input.
        value: String,
        /// The accepted labels.
        allowed: &'static [&'static str],
    },
}

/// A rejected field together with its dotted payload path.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {kind}")]
pub struct ValidationError {
    field: String,
    kind: ValidationErrorKind,
}

impl ValidationError {
    /// Creates an error for `field`.
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    /// Shorthand for a missing field.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::Missing)
    }

    /// Dotted path of the offending field, such as `patient.age`.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The reason the field was rejected.
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }

    /// Returns `true` when the field was absent from the payload.
    pub fn is_missing(&self) -> bool {
        matches!(self.kind, ValidationErrorKind::Missing)
    }
}

/// Converts a dotted path into a JSON pointer (`patient.age` → `/patient/age`).
pub(crate) fn json_pointer(path: &str) -> String {
    path.split('.').fold(String::new(), |mut pointer, segment| {
        pointer.push('/');
        pointer.push_str(segment);
        pointer
    })
}

/// Returns the first required field that is absent or null in `value`.
pub(crate) fn first_missing_field(value: &serde_json::Value) -> Option<&'static str> {
    REQUIRED_FIELDS.iter().copied().find(|path| {
        value
            .pointer(&json_pointer(path))
            .map_or(true, serde_json::Value::is_null)
    })
}

pub(crate) fn check_date(field: &str, value: &str) -> Result<(), ValidationError> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| {
            ValidationError::new(
                field,
                ValidationErrorKind::InvalidFormat {
                    expected: "a date as YYYY-MM-DD",
                    value: value.to_string(),
                },
            )
        })
}

pub(crate) fn check_time(field: &str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    chrono::NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| chrono::NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map(|_| ())
        .map_err(|_| {
            ValidationError::new(
                field,
                ValidationErrorKind::InvalidFormat {
                    expected: "a time of day as HH:MM or HH:MM:SS",
                    value: value.to_string(),
                },
            )
        })
}

pub(crate) fn check_distance(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            ValidationErrorKind::Negative {
                value: value.to_string(),
            },
        ))
    }
}

pub(crate) fn check_age(field: &str, value: i64) -> Result<u8, ValidationError> {
    if (MIN_AGE..=MAX_AGE).contains(&value) {
        // The range check above keeps the value within u8.
        Ok(value as u8)
    } else {
        Err(ValidationError::new(
            field,
            ValidationErrorKind::OutOfRange {
                value: value.to_string(),
                min: MIN_AGE,
                max: MAX_AGE,
            },
        ))
    }
}
