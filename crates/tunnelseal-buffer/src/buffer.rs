//! Owned byte buffer that wipes itself on release
//!
//! # Security Properties
//!
//! - Bytes are never read or written outside `[0, len)`
//! - Truncation, prefix removal and growth zero the bytes they give up
//! - Dropping the buffer zeroes its whole allocation

use std::{fmt, ops::Range};

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{BufferError, Result};

/// Owned, mutable byte buffer for secret material.
///
/// The logical length is the number of bytes currently held; the backing
/// allocation may be larger after truncation. Every copy is deep.
#[derive(Clone, Default)]
pub struct SecureBuffer {
    bytes: Vec<u8>,
}

impl SecureBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Buffer of `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self { bytes: vec![0u8; len] }
    }

    /// Copy of the whole `src` slice.
    pub fn from_slice(src: &[u8]) -> Self {
        Self { bytes: src.to_vec() }
    }

    /// Copy of the first `len` bytes of `src`.
    ///
    /// # Errors
    ///
    /// - `OutOfRange`: if `len` exceeds `src.len()`
    pub fn from_prefix(src: &[u8], len: usize) -> Result<Self> {
        Self::from_range(src, 0, len)
    }

    /// Copy of `len` bytes of `src` starting at `offset`.
    ///
    /// # Errors
    ///
    /// - `OutOfRange`: if `offset + len` exceeds `src.len()`
    pub fn from_range(src: &[u8], offset: usize, len: usize) -> Result<Self> {
        let range = checked_range(offset, len, src.len())?;
        Ok(Self { bytes: src[range].to_vec() })
    }

    /// Single-byte buffer.
    pub fn from_u8(value: u8) -> Self {
        Self { bytes: vec![value] }
    }

    /// Two-byte buffer holding `value` in network (big-endian) order.
    pub fn from_u16(value: u16) -> Self {
        Self { bytes: value.to_be_bytes().to_vec() }
    }

    /// UTF-8 encoding of `text`, followed by one zero byte when
    /// `null_terminated` is set.
    pub fn from_text(text: &str, null_terminated: bool) -> Self {
        let mut bytes = Vec::with_capacity(text.len() + usize::from(null_terminated));
        bytes.extend_from_slice(text.as_bytes());
        if null_terminated {
            bytes.push(0);
        }
        Self { bytes }
    }

    /// Logical length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the content.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Borrow the content mutably. The length cannot change through this view.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Big-endian `u16` at `offset`.
    ///
    /// # Errors
    ///
    /// - `OutOfRange`: if `offset + 2` exceeds the length
    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        let range = checked_range(offset, 2, self.len())?;
        let bytes = &self.bytes[range];
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// UTF-8 string starting at `offset` and ending before the first zero
    /// byte, or at the end of the buffer when there is none.
    ///
    /// # Errors
    ///
    /// - `OutOfRange`: if `offset` is past the end
    /// - `InvalidUtf8`: if the bytes do not decode
    pub fn read_null_terminated_str(&self, offset: usize) -> Result<String> {
        let range = checked_range(offset, 0, self.len())?;
        let tail = &self.bytes[range.start..];
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());

        std::str::from_utf8(&tail[..end])
            .map(str::to_owned)
            .map_err(|_| BufferError::InvalidUtf8 { offset })
    }

    /// Independent copy of `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// - `OutOfRange`: if `offset + len` exceeds the length
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        Self::from_range(&self.bytes, offset, len)
    }

    /// Append the content of `other`.
    pub fn append(&mut self, other: &Self) {
        self.append_slice(&other.bytes);
    }

    /// Append raw bytes.
    pub fn append_slice(&mut self, other: &[u8]) {
        let required = self.bytes.len() + other.len();
        if required > self.bytes.capacity() {
            // Vec growth would free the old region unwiped
            let mut grown = Vec::with_capacity(required);
            grown.extend_from_slice(&self.bytes);
            let mut old = std::mem::replace(&mut self.bytes, grown);
            old.zeroize();
        }
        self.bytes.extend_from_slice(other);
    }

    /// New buffer holding `self` followed by `other`.
    pub fn appending(&self, other: &Self) -> Self {
        let mut bytes = Vec::with_capacity(self.len() + other.len());
        bytes.extend_from_slice(&self.bytes);
        bytes.extend_from_slice(&other.bytes);
        Self { bytes }
    }

    /// Keep only the first `size` bytes. The discarded tail is zeroed.
    ///
    /// # Errors
    ///
    /// - `OutOfRange`: if `size` exceeds the length
    pub fn truncate(&mut self, size: usize) -> Result<()> {
        checked_range(0, size, self.len())?;
        self.wipe_from(size);
        self.bytes.truncate(size);
        Ok(())
    }

    /// Drop the first `offset` bytes and shift the rest down to index 0.
    ///
    /// # Errors
    ///
    /// - `OutOfRange`: if `offset` exceeds the length
    pub fn remove_until(&mut self, offset: usize) -> Result<()> {
        checked_range(0, offset, self.len())?;
        let remaining = self.shift_down(offset);
        self.bytes.truncate(remaining);
        Ok(())
    }

    /// Overwrite every byte with zero. The length is unchanged.
    pub fn zero(&mut self) {
        self.bytes.as_mut_slice().zeroize();
    }

    /// Lowercase hex rendering of the content.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Zero `[from, len)` without changing the length.
    fn wipe_from(&mut self, from: usize) {
        self.bytes[from..].zeroize();
    }

    /// Move `[offset, len)` to the front and zero everything behind it.
    /// Returns the number of bytes still live.
    fn shift_down(&mut self, offset: usize) -> usize {
        let remaining = self.bytes.len() - offset;
        self.bytes.copy_within(offset.., 0);
        self.wipe_from(remaining);
        remaining
    }
}

/// Validate `[offset, offset + len)` against `available`.
fn checked_range(offset: usize, len: usize, available: usize) -> Result<Range<usize>> {
    offset
        .checked_add(len)
        .filter(|&end| end <= available)
        .map(|end| offset..end)
        .ok_or(BufferError::OutOfRange { offset, length: len, available })
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl PartialEq for SecureBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && bool::from(self.bytes.as_slice().ct_eq(other.as_slice()))
    }
}

impl Eq for SecureBuffer {}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBuffer").field("len", &self.len()).finish_non_exhaustive()
    }
}

impl AsRef<[u8]> for SecureBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Takes ownership of `bytes` without copying.
impl From<Vec<u8>> for SecureBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}
