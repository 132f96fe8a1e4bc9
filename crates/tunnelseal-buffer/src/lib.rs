//! Tunnelseal Secret Buffers
//!
//! An owned byte container for key material, plaintext and ciphertext. All
//! higher-level crypto operations allocate, slice and combine their working
//! data through [`SecureBuffer`].
//!
//! # Lifecycle
//!
//! ```text
//! create (zeroed / from bytes / from range / from text / from integer)
//!        │
//!        ▼
//! mutate in place (append, truncate, remove_until, zero)
//!        │
//!        ▼
//! drop → whole allocation overwritten with zeros → freed
//! ```
//!
//! # Security
//!
//! Wiping:
//! - Every destructive operation zeroes the bytes it releases before they
//!   become unreachable
//! - Growth copies into a fresh allocation and wipes the old one, so the
//!   allocator never receives unwiped secret bytes
//! - `Drop` wipes unconditionally, including on early returns and unwinding
//!
//! Ownership:
//! - Single owner, no shared or weak handles
//! - `Clone` is always a deep copy; slices are independent buffers
//!
//! Disclosure:
//! - `Debug` prints the length only
//! - Equality runs in constant time over the content

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod buffer;
pub mod error;

pub use buffer::SecureBuffer;
pub use error::{BufferError, Result};
