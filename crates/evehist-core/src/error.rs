//! Error types for evehist-core.
//!
//! Only construction, external input and persistence can fail. Ring-buffer
//! arithmetic and entry encoding are total: fixed-width wraparound is part
//! of the wire format, not an error.
//!
//! | Error | Raised by | Handling |
//! |-------|-----------|----------|
//! | [`Error::Validation`] | adapter builders | Fatal at construction, fix the caller |
//! | [`Error::Decode`] | request/clock field writes | Logged, request ignored |
//! | [`Error::OutOfRange`] | [`RingBuffer::get`](crate::RingBuffer::get) | Caller skips the index |
//! | [`Error::InvalidSnapshot`] | [`HistoryStore::restore`](crate::HistoryStore::restore) | Logged, store starts empty |
//! | [`Error::Storage`] | snapshot load/save | Logged, retried on the next save tick |
//! | [`Error::Unsupported`] | reset-total on non-energy adapters | Reported to the host |

use thiserror::Error;

/// Errors produced by the history engine.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed construction arguments.
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// Malformed payload written by the host.
    #[error(transparent)]
    Decode(#[from] evehist_types::DecodeError),

    /// Logical index outside the retained window.
    #[error("Entry {index} out of range (retained {first}..={last})")]
    OutOfRange {
        /// Requested logical index.
        index: u32,
        /// Oldest retained logical index.
        first: u32,
        /// Newest logical index.
        last: u32,
    },

    /// Persisted snapshot is internally inconsistent.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Operation not offered by this sensor kind.
    #[error("Operation '{operation}' not supported by {kind} sensors")]
    Unsupported {
        /// The attempted operation.
        operation: &'static str,
        /// Sensor kind that rejected it.
        kind: evehist_types::SensorKind,
    },

    /// Snapshot persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] evehist_store::Error),
}

impl Error {
    /// Create a validation error for a missing collaborator.
    pub fn missing(what: &str) -> Self {
        Self::Validation(format!("missing required characteristic '{}'", what))
    }

    /// Create an invalid snapshot error.
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot(message.into())
    }
}

/// Result type alias using evehist-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use evehist_types::{DecodeError, SensorKind};

    #[test]
    fn test_error_display() {
        let err = Error::missing("contact");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: missing required characteristic 'contact'"
        );

        let err = Error::OutOfRange {
            index: 0,
            first: 1,
            last: 10,
        };
        assert_eq!(err.to_string(), "Entry 0 out of range (retained 1..=10)");

        let err = Error::Unsupported {
            operation: "reset_total",
            kind: SensorKind::Weather,
        };
        assert!(err.to_string().contains("weather"));
    }

    #[test]
    fn test_decode_error_conversion() {
        let err: Error = DecodeError::OddLength(3).into();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.to_string().contains("Odd hex length"));
    }
}
