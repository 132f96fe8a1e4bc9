//! Error types for buffer operations

use thiserror::Error;

/// Result alias for buffer operations
pub type Result<T> = std::result::Result<T, BufferError>;

/// Errors from [`crate::SecureBuffer`] operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Requested range does not fit inside the buffer
    #[error("range out of bounds: {length} bytes at offset {offset}, only {available} available")]
    OutOfRange {
        /// Start of the requested range
        offset: usize,
        /// Length of the requested range
        length: usize,
        /// Bytes actually available
        available: usize,
    },

    /// Bytes starting at `offset` are not valid UTF-8
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 {
        /// Offset the decoding started from
        offset: usize,
    },
}
