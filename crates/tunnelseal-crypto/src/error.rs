//! Error types for envelope operations

use thiserror::Error;
use tunnelseal_buffer::BufferError;

use crate::cbc::Direction;

/// Result alias for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Coarse classification of [`CryptoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Direction not configured, configured twice, or wrong key material
    Configuration,
    /// Envelope failed HMAC verification
    Authentication,
    /// Offset or length outside a buffer
    Range,
    /// The cipher, digest or RNG rejected its inputs
    Backend,
}

/// Errors from envelope operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Operation used a direction whose keys were never bound
    #[error("{direction} keys are not configured")]
    NotConfigured {
        /// Direction that was used
        direction: Direction,
    },

    /// Keys for a direction can be bound only once
    #[error("{direction} keys are already configured")]
    AlreadyConfigured {
        /// Direction that was reconfigured
        direction: Direction,
    },

    /// Cipher suite needs a cipher key that was not supplied
    #[error("cipher key required but not configured")]
    MissingCipherKey,

    /// MAC-only suite was given a cipher key
    #[error("cipher key supplied for a suite without cipher")]
    UnexpectedCipherKey,

    /// Key material shorter than the algorithm needs
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Minimum key length
        expected: usize,
        /// Supplied key length
        actual: usize,
    },

    /// HMAC tag did not match
    #[error("HMAC verification failed")]
    AuthenticationFailed,

    /// Envelope too short to hold tag and IV
    #[error("envelope too short: expected at least {expected} bytes, got {actual}")]
    EnvelopeTooShort {
        /// Minimum envelope length
        expected: usize,
        /// Actual envelope length
        actual: usize,
    },

    /// Buffer range error
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Cipher or digest name not recognised
    #[error("unsupported algorithm: {name}")]
    UnsupportedAlgorithm {
        /// Name as given
        name: String,
    },

    /// CBC ciphertext had a bad length or bad PKCS#7 padding
    #[error("bad CBC padding")]
    BadPadding,

    /// OS random number generator failed
    #[error("random source failed: {reason}")]
    RandomSource {
        /// Reason reported by the OS
        reason: String,
    },

    /// Static key file could not be parsed
    #[error("invalid static key: {reason}")]
    InvalidStaticKey {
        /// What was wrong
        reason: String,
    },
}

impl CryptoError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConfigured { .. }
            | Self::AlreadyConfigured { .. }
            | Self::MissingCipherKey
            | Self::UnexpectedCipherKey
            | Self::InvalidKeyLength { .. }
            | Self::InvalidStaticKey { .. } => ErrorKind::Configuration,

            Self::AuthenticationFailed | Self::EnvelopeTooShort { .. } => ErrorKind::Authentication,

            Self::Buffer(_) => ErrorKind::Range,

            Self::UnsupportedAlgorithm { .. } | Self::BadPadding | Self::RandomSource { .. } => {
                ErrorKind::Backend
            },
        }
    }

    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// Fatal errors mean the engine or its peer is broken and the session
    /// should be torn down. Authentication and range failures only condemn
    /// the packet at hand.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Backend)
    }
}
