//! Cipher and digest identifiers, and the suite that combines them
//!
//! Names follow OpenVPN (`AES-128-CBC`, `SHA256`) and parse
//! case-insensitively.

use std::{fmt, str::FromStr};

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{
    BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit, block_padding::Pkcs7,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use tunnelseal_buffer::SecureBuffer;

use crate::error::{CryptoError, Result};

/// AES block size shared by every supported cipher
const AES_BLOCK_LEN: usize = 16;

/// Block cipher run in CBC mode with PKCS#7 padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cipher {
    /// AES with a 128-bit key
    #[serde(rename = "AES-128-CBC", alias = "aes-128-cbc")]
    Aes128Cbc,
    /// AES with a 192-bit key
    #[serde(rename = "AES-192-CBC", alias = "aes-192-cbc")]
    Aes192Cbc,
    /// AES with a 256-bit key
    #[serde(rename = "AES-256-CBC", alias = "aes-256-cbc")]
    Aes256Cbc,
}

impl Cipher {
    /// All supported ciphers.
    pub const ALL: [Self; 3] = [Self::Aes128Cbc, Self::Aes192Cbc, Self::Aes256Cbc];

    /// OpenVPN name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Aes128Cbc => "AES-128-CBC",
            Self::Aes192Cbc => "AES-192-CBC",
            Self::Aes256Cbc => "AES-256-CBC",
        }
    }

    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128Cbc => 16,
            Self::Aes192Cbc => 24,
            Self::Aes256Cbc => 32,
        }
    }

    /// Block length in bytes, which is also the IV length.
    pub fn block_len(self) -> usize {
        AES_BLOCK_LEN
    }

    /// Ciphertext length for `len` plaintext bytes (padding always adds at
    /// least one byte).
    pub fn padded_len(self, len: usize) -> usize {
        let block = self.block_len();
        (len / block + 1) * block
    }

    pub(crate) fn encrypt(self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Aes128Cbc => cbc_encrypt::<Aes128>(key, iv, plaintext),
            Self::Aes192Cbc => cbc_encrypt::<Aes192>(key, iv, plaintext),
            Self::Aes256Cbc => cbc_encrypt::<Aes256>(key, iv, plaintext),
        }
    }

    /// Decrypts inside a [`SecureBuffer`], so recovered bytes are wiped on
    /// every exit path, including bad padding.
    pub(crate) fn decrypt(self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<SecureBuffer> {
        match self {
            Self::Aes128Cbc => cbc_decrypt::<Aes128>(key, iv, ciphertext),
            Self::Aes192Cbc => cbc_decrypt::<Aes192>(key, iv, ciphertext),
            Self::Aes256Cbc => cbc_decrypt::<Aes256>(key, iv, ciphertext),
        }
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cipher {
    type Err = CryptoError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|cipher| cipher.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm { name: name.to_string() })
    }
}

/// Hash function keyed into HMAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Digest {
    /// SHA-1 (tls-auth compatibility)
    #[serde(rename = "SHA1", alias = "sha1")]
    Sha1,
    /// SHA-224
    #[serde(rename = "SHA224", alias = "sha224")]
    Sha224,
    /// SHA-256
    #[serde(rename = "SHA256", alias = "sha256")]
    Sha256,
    /// SHA-384
    #[serde(rename = "SHA384", alias = "sha384")]
    Sha384,
    /// SHA-512
    #[serde(rename = "SHA512", alias = "sha512")]
    Sha512,
}

impl Digest {
    /// All supported digests.
    pub const ALL: [Self; 5] = [Self::Sha1, Self::Sha224, Self::Sha256, Self::Sha384, Self::Sha512];

    /// OpenVPN name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha224 => "SHA224",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    /// HMAC output length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// HMAC over the concatenation of `parts`.
    pub(crate) fn sign(self, key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
        match self {
            Self::Sha1 => hmac_sign::<Hmac<Sha1>>(key, parts),
            Self::Sha224 => hmac_sign::<Hmac<Sha224>>(key, parts),
            Self::Sha256 => hmac_sign::<Hmac<Sha256>>(key, parts),
            Self::Sha384 => hmac_sign::<Hmac<Sha384>>(key, parts),
            Self::Sha512 => hmac_sign::<Hmac<Sha512>>(key, parts),
        }
    }

    /// Constant-time check of `tag` against the HMAC over `parts`.
    pub(crate) fn verify(self, key: &[u8], parts: &[&[u8]], tag: &[u8]) -> bool {
        let expected = self.sign(key, parts);
        bool::from(expected.as_slice().ct_eq(tag))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Digest {
    type Err = CryptoError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|digest| digest.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm { name: name.to_string() })
    }
}

/// Algorithms protecting one envelope.
///
/// `Authenticated` encrypts and authenticates; `MacOnly` authenticates the
/// plaintext as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suite {
    /// CBC encryption followed by HMAC over IV and ciphertext
    Authenticated {
        /// Block cipher
        cipher: Cipher,
        /// HMAC digest
        digest: Digest,
    },
    /// HMAC over the plaintext, no confidentiality
    MacOnly {
        /// HMAC digest
        digest: Digest,
    },
}

impl Suite {
    /// Resolve OpenVPN algorithm names. A `None` cipher selects `MacOnly`.
    ///
    /// # Errors
    ///
    /// - `UnsupportedAlgorithm`: if either name is unknown
    pub fn from_names(cipher: Option<&str>, digest: &str) -> Result<Self> {
        let digest = digest.parse()?;
        match cipher {
            Some(name) => Ok(Self::Authenticated { cipher: name.parse()?, digest }),
            None => Ok(Self::MacOnly { digest }),
        }
    }

    /// The cipher, if any.
    pub fn cipher(&self) -> Option<Cipher> {
        match self {
            Self::Authenticated { cipher, .. } => Some(*cipher),
            Self::MacOnly { .. } => None,
        }
    }

    /// The HMAC digest.
    pub fn digest(&self) -> Digest {
        match self {
            Self::Authenticated { digest, .. } | Self::MacOnly { digest } => *digest,
        }
    }

    /// Length of the HMAC tag that opens every envelope.
    pub fn digest_len(&self) -> usize {
        self.digest().output_len()
    }

    /// Length of the IV following the tag, 0 without a cipher.
    pub fn iv_len(&self) -> usize {
        self.cipher().map_or(0, Cipher::block_len)
    }

    /// AEAD tag length. CBC envelopes carry none.
    pub fn tag_len(&self) -> usize {
        0
    }

    /// Fixed bytes preceding the payload: tag and IV.
    pub fn overhead(&self) -> usize {
        self.digest_len() + self.iv_len()
    }

    /// Exact envelope length for `len` plaintext bytes.
    pub fn encryption_capacity(&self, len: usize) -> usize {
        match self {
            Self::Authenticated { cipher, .. } => self.overhead() + cipher.padded_len(len),
            Self::MacOnly { .. } => self.overhead() + len,
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated { cipher, digest } => write!(f, "{cipher}/{digest}"),
            Self::MacOnly { digest } => write!(f, "{digest}"),
        }
    }
}

fn hmac_sign<M>(key: &[u8], parts: &[&[u8]]) -> Vec<u8>
where
    M: Mac + KeyInit,
{
    let Ok(mut mac) = <M as Mac>::new_from_slice(key) else {
        unreachable!("HMAC accepts any key size");
    };
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().to_vec()
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CryptoError::InvalidKeyLength { expected: C::key_size(), actual: key.len() })?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<SecureBuffer>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CryptoError::InvalidKeyLength { expected: C::key_size(), actual: key.len() })?;

    let mut buffer = SecureBuffer::from_slice(ciphertext);
    let len = decryptor
        .decrypt_padded_mut::<Pkcs7>(buffer.as_mut_slice())
        .map_err(|_| CryptoError::BadPadding)?
        .len();
    buffer.truncate(len)?;
    Ok(buffer)
}
