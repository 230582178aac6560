//! Error types for decoding history payloads in evehist-types.

use thiserror::Error;

/// Errors that can occur when decoding text-wrapped binary payloads.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Hex input had an odd number of digits after stripping separators.
    #[error("Odd hex length: {0} digits")]
    OddLength(usize),

    /// Input was not valid base64.
    #[error("Invalid base64: {0}")]
    Base64(String),

    /// Payload is shorter than the field being read.
    #[error("Payload too short: requires {expected} hex digits, got {actual}")]
    Truncated {
        /// Hex digits required.
        expected: usize,
        /// Hex digits available.
        actual: usize,
    },
}

impl From<base64::DecodeError> for DecodeError {
    fn from(err: base64::DecodeError) -> Self {
        DecodeError::Base64(err.to_string())
    }
}

/// Result type alias using evehist-types' DecodeError type.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
