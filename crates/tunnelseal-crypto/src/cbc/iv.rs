//! IV generation strategies
//!
//! The strategy is picked by the caller on every encryption. Production code
//! goes through [`SystemIv`]; the deterministic [`FixedIv`] only exists in
//! test builds or with the `test-utils` feature.

use crate::error::{CryptoError, Result};

/// Fills a fresh IV for one encryption.
///
/// # Invariants
///
/// - Production implementations MUST use a cryptographically secure RNG and
///   never repeat an IV under the same key
pub trait IvSource {
    /// Overwrite all of `iv`.
    fn fill_iv(&self, iv: &mut [u8]) -> Result<()>;
}

/// OS CSPRNG (getrandom).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIv;

impl IvSource for SystemIv {
    fn fill_iv(&self, iv: &mut [u8]) -> Result<()> {
        getrandom::fill(iv).map_err(|err| CryptoError::RandomSource { reason: err.to_string() })
    }
}

/// Fixed IV for reproducible vectors.
///
/// The block is zero-padded or truncated to the IV length.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Default)]
pub struct FixedIv {
    block: Vec<u8>,
}

#[cfg(any(test, feature = "test-utils"))]
impl FixedIv {
    /// All-zero IV.
    pub fn zeroed() -> Self {
        Self { block: Vec::new() }
    }

    /// IV starting with `block`.
    pub fn new(block: &[u8]) -> Self {
        Self { block: block.to_vec() }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl IvSource for FixedIv {
    fn fill_iv(&self, iv: &mut [u8]) -> Result<()> {
        iv.fill(0);
        let len = iv.len().min(self.block.len());
        iv[..len].copy_from_slice(&self.block[..len]);
        Ok(())
    }
}
