//! Error types for column profiling.

use thiserror::Error;

/// Result type for profiling operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors that can occur while building, merging or decoding profiles.
///
/// Tracking a value never fails. Estimation error of the approximate
/// sketches is a documented property of each sketch, not an error.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A serialized profile or sketch payload is malformed or has an
    /// unsupported version.
    #[error("Failed to deserialize: {0}")]
    Deserialization(String),

    /// Two sketches cannot be unioned (different capacities or encodings).
    #[error("Failed to merge: {0}")]
    Merge(String),

    /// Invalid configuration or parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Arrow error raised while ingesting an array.
    #[error("Arrow computation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Summary serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProfileError {
    /// Creates a deserialization error with the given message.
    pub fn deserialization(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }

    /// Creates a merge error with the given message.
    pub fn merge(msg: impl Into<String>) -> Self {
        Self::Merge(msg.into())
    }

    /// Creates an invalid configuration error with the given message.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Returns true if this error was raised while decoding a payload.
    pub fn is_deserialization(&self) -> bool {
        matches!(self, Self::Deserialization(_))
    }

    /// Returns true if this error was raised by a merge.
    pub fn is_merge(&self) -> bool {
        matches!(self, Self::Merge(_))
    }
}

impl From<prost::DecodeError> for ProfileError {
    fn from(err: prost::DecodeError) -> Self {
        Self::Deserialization(err.to_string())
    }
}

/// Truncated reads inside sketch payloads surface as I/O errors from
/// `byteorder`; they always mean a corrupt payload.
impl From<std::io::Error> for ProfileError {
    fn from(err: std::io::Error) -> Self {
        Self::Deserialization(format!("truncated payload: {err}"))
    }
}

/// Converts serde_json errors to ProfileError.
impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
