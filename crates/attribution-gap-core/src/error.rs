//! Error taxonomy for cohort configuration and population analysis.
//!
//! Undefined metrics (zero denominators) are not errors; they surface as
//! `None` in [`crate::analysis::SegmentMetrics`].

use thiserror::Error;

use crate::segment::Segment;

/// Invalid generator or analyzer configuration. Raised before any data is drawn.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("at least one segment must be configured")]
    NoSegments,

    #[error("segment '{0}' is configured more than once")]
    DuplicateSegment(Segment),

    #[error("unknown segment '{0}'")]
    UnknownSegment(String),

    #[error("segment priors must sum to 1, got {sum}")]
    PriorsDoNotSumToOne { sum: f64 },

    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: String, value: f64 },

    #[error("at least one channel must be configured")]
    NoChannels,

    #[error("channel names must not be empty")]
    EmptyChannelName,

    #[error("channel '{0}' is configured more than once")]
    DuplicateChannel(String),

    #[error("segment '{segment}' prefers channel '{channel}', which is not configured")]
    UnknownAffinityChannel { segment: Segment, channel: String },

    #[error("value range must satisfy 0 < min < max, got [{min}, {max})")]
    InvalidValueRange { min: f64, max: f64 },
}

/// Malformed input row handed to the analyzer. Always names the offending row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: segment '{segment}' is not part of the configured segment set")]
    UnknownSegment { row: usize, segment: String },

    #[error("row {row}: channel '{channel}' is not a configured channel")]
    UnknownChannel { row: usize, channel: String },

    #[error("row {row}: value must be finite and non-negative, got {value}")]
    InvalidValue { row: usize, value: f64 },

    #[error("row {row}: value must be positive exactly when the user converted")]
    ValueConversionMismatch { row: usize },

    #[error("row {row}: attributed channel set on a record that did not both convert and see an ad")]
    AttributionWithoutExposure { row: usize },
}

/// Crate-level error for operations that also touch the filesystem or JSON.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_row_and_field() {
        let err = SchemaError::MissingField {
            row: 7,
            field: "converted",
        };
        assert_eq!(err.to_string(), "row 7: missing required field 'converted'");
    }

    #[test]
    fn configuration_error_converts_into_crate_error() {
        let err: Error = ConfigurationError::NoChannels.into();
        assert!(matches!(err, Error::Configuration(ConfigurationError::NoChannels)));
        assert!(err.to_string().contains("channel"));
    }
}
