//! Error types for rapid_filtering
//!
//! This module defines the error types used throughout the library.
//! All errors are designed to be informative and actionable.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FilteringError>;

/// Main error type for rapid_filtering
#[derive(Error, Debug, Clone)]
pub enum FilteringError {
    /// Configuration validation failed (empty parameter list, duplicates,
    /// out-of-range values, incompatible k and n_cut)
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Malformed input list (missing count, missing separator, unparseable field)
    #[error("Input format error: {message}")]
    InputFormat { message: String },

    /// A solution violated its quality or ordering guarantees.
    /// This always indicates a bug in a pruner or filter, never bad input.
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    /// An external resource could not be used (unreadable file, directory
    /// where a file was expected, CPU pinning failure)
    #[error("Resource error: {message}")]
    Resource { message: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl FilteringError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an input format error
    pub fn input_format(message: impl Into<String>) -> Self {
        Self::InputFormat {
            message: message.into(),
        }
    }

    /// Create an invariant violation error
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a resource error
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Check if this error indicates a broken pruner/filter guarantee
    /// (as opposed to bad input or configuration)
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

impl From<std::io::Error> for FilteringError {
    fn from(err: std::io::Error) -> Self {
        Self::resource(err.to_string())
    }
}

impl From<serde_json::Error> for FilteringError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
