//! Tunnelseal Data-Channel Envelope
//!
//! Authenticated encryption for OpenVPN-style tunnels built from AES in CBC
//! mode and an HMAC (encrypt-then-MAC), plus an HMAC-only mode used for
//! tls-auth style control packets.
//!
//! # Envelope Flow
//!
//! ```text
//! plaintext
//!      │
//!      ▼
//! AES-CBC (random IV, PKCS#7) → IV || ciphertext
//!      │
//!      ▼
//! HMAC(ad || IV || ciphertext) → tag
//!      │
//!      ▼
//! tag || IV || ciphertext
//! ```
//!
//! The receiver recomputes the tag first and decrypts only on a match.
//!
//! # Keys
//!
//! Each direction owns its own cipher and HMAC key, held in
//! [`SecureBuffer`](tunnelseal_buffer::SecureBuffer)s that are wiped on drop.
//! [`StaticKey`] derives both directions from a pre-shared OpenVPN static key,
//! and [`CryptoBox`] binds them in one step.
//!
//! # Security
//!
//! - IVs come from the OS CSPRNG unless a test strategy is injected
//! - Tags are compared in constant time
//! - A failed tag rejects the envelope before any cipher work
//! - Keys and plaintexts never appear in logs or `Debug` output

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod cbc;
pub mod crypto_box;
pub mod error;
pub mod static_key;

pub use algorithm::{Cipher, Digest, Suite};
#[cfg(any(test, feature = "test-utils"))]
pub use cbc::FixedIv;
pub use cbc::{CbcEngine, CryptoFlags, Direction, IvSource, SystemIv};
pub use crypto_box::{CryptoBox, CryptoKeys, CryptoOptions};
pub use error::{CryptoError, ErrorKind, Result};
pub use static_key::{KeyDirection, StaticKey};
