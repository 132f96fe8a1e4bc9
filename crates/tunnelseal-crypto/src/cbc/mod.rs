//! CBC + HMAC envelope engine
//!
//! Protects data-channel payloads with a block cipher in CBC mode and an
//! HMAC over the encrypted bytes. A suite without cipher authenticates the
//! plaintext only.
//!
//! # Wire Layout
//!
//! ```text
//! Authenticated:  [ HMAC tag | IV | CBC ciphertext (PKCS#7) ]
//! MacOnly:        [ HMAC tag | plaintext ]
//!
//! tag = HMAC(hmac_key, ad || everything after the tag)
//! ```
//!
//! The tag covers the already-encrypted bytes, so a receiver can check
//! authenticity with the HMAC key alone and never touches the cipher key on
//! forged input.
//!
//! # Security Properties
//!
//! - Production IVs come from the OS CSPRNG, fresh for every envelope
//! - Tags are compared in constant time
//! - Decryption runs only after the tag verified
//! - Keys live in `SecureBuffer`s owned by the engine and are never logged

pub mod engine;
pub mod flags;
pub mod iv;

pub use engine::{CbcEngine, Direction};
pub use flags::CryptoFlags;
#[cfg(any(test, feature = "test-utils"))]
pub use iv::FixedIv;
pub use iv::{IvSource, SystemIv};
