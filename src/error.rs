//! Unified error handling for the track core.
//!
//! Numerical edge cases and rejected fixes are never errors: they are
//! resolved locally by the filter and the geometry helpers. Errors cover
//! session lifecycle misuse, configuration and serialization only.

use std::fmt;

/// Unified error type for track core operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackError {
    /// Too few fixes survived to build an activity summary
    InsufficientPoints {
        activity_type: String,
        point_count: usize,
        minimum_required: usize,
    },
    /// `start` was called with an empty activity tag
    EmptyActivityType,
    /// `start` was called while a session is already open
    AlreadyTracking { activity_type: String },
    /// `stop` was called with no open session
    NotTracking,
    /// Configuration error
    ConfigError { message: String },
    /// JSON encoding/decoding error
    Serialization { message: String },
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackError::InsufficientPoints {
                activity_type,
                point_count,
                minimum_required,
            } => {
                write!(
                    f,
                    "Activity '{}' has {} usable points, minimum {} required",
                    activity_type, point_count, minimum_required
                )
            }
            TrackError::EmptyActivityType => {
                write!(f, "Activity type must not be empty")
            }
            TrackError::AlreadyTracking { activity_type } => {
                write!(f, "A '{}' session is already being tracked", activity_type)
            }
            TrackError::NotTracking => write!(f, "No tracking session is open"),
            TrackError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            TrackError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
        }
    }
}

impl std::error::Error for TrackError {}

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        TrackError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for track core operations.
pub type Result<T> = std::result::Result<T, TrackError>;
