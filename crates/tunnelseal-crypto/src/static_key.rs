//! Pre-shared OpenVPN static key
//!
//! A static key is 256 bytes split into four 64-byte slots. Which slot feeds
//! which role depends on the key direction both peers agreed on:
//!
//! ```text
//! slot      0                    1                    2           3
//! none      cipher enc + dec     hmac send + recv     unused      unused
//! server    cipher enc           hmac send            cipher dec  hmac recv
//! client    cipher dec           hmac recv            cipher enc  hmac send
//! ```

use tunnelseal_buffer::SecureBuffer;
use zeroize::Zeroizing;

use crate::{
    crypto_box::CryptoKeys,
    error::{CryptoError, Result},
};

/// Total size of a static key
pub const STATIC_KEY_LEN: usize = 256;

/// Size of one key slot
pub const SLOT_LEN: usize = 64;

const PEM_BEGIN: &str = "-----BEGIN OpenVPN Static key V1-----";
const PEM_END: &str = "-----END OpenVPN Static key V1-----";

/// Side of a directional static key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyDirection {
    /// `key-direction 0`
    Server,
    /// `key-direction 1`
    Client,
}

impl KeyDirection {
    /// OpenVPN numeric form.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Server => 0,
            Self::Client => 1,
        }
    }

    /// Parse the OpenVPN numeric form.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Server),
            1 => Some(Self::Client),
            _ => None,
        }
    }
}

/// 256-byte pre-shared key with an optional direction.
#[derive(Clone)]
pub struct StaticKey {
    data: SecureBuffer,
    direction: Option<KeyDirection>,
}

impl StaticKey {
    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// `InvalidStaticKey` if `bytes` is not exactly 256 bytes long.
    pub fn from_bytes(bytes: &[u8], direction: Option<KeyDirection>) -> Result<Self> {
        if bytes.len() != STATIC_KEY_LEN {
            return Err(CryptoError::InvalidStaticKey {
                reason: format!("expected {STATIC_KEY_LEN} bytes, got {}", bytes.len()),
            });
        }
        Ok(Self { data: SecureBuffer::from_slice(bytes), direction })
    }

    /// Parse the `OpenVPN Static key V1` file format.
    ///
    /// Lines outside the BEGIN/END markers are ignored, as are `#` and `;`
    /// comments.
    ///
    /// # Errors
    ///
    /// `InvalidStaticKey` if the markers are missing, the body is not hex, or
    /// it does not decode to 256 bytes.
    pub fn from_pem_lines<'a, I>(lines: I, direction: Option<KeyDirection>) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hex_body = Zeroizing::new(String::with_capacity(2 * STATIC_KEY_LEN));
        let mut inside = false;
        let mut closed = false;

        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line == PEM_BEGIN {
                inside = true;
                continue;
            }
            if line == PEM_END {
                closed = inside;
                break;
            }
            if inside {
                hex_body.push_str(line);
            }
        }

        if !closed {
            return Err(CryptoError::InvalidStaticKey { reason: "missing key markers".into() });
        }

        let bytes = Zeroizing::new(hex::decode(hex_body.as_bytes()).map_err(|e| {
            CryptoError::InvalidStaticKey { reason: format!("bad hex body: {e}") }
        })?);
        Self::from_bytes(&bytes, direction)
    }

    /// Parse a whole static key file.
    ///
    /// # Errors
    ///
    /// As [`Self::from_pem_lines`].
    pub fn from_pem(text: &str, direction: Option<KeyDirection>) -> Result<Self> {
        Self::from_pem_lines(text.lines(), direction)
    }

    /// Direction this key was loaded with.
    pub fn direction(&self) -> Option<KeyDirection> {
        self.direction
    }

    /// Raw key bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Cipher key for outgoing data.
    pub fn cipher_encrypt_key(&self) -> SecureBuffer {
        match self.direction {
            None | Some(KeyDirection::Server) => self.slot(0),
            Some(KeyDirection::Client) => self.slot(2),
        }
    }

    /// Cipher key for incoming data.
    pub fn cipher_decrypt_key(&self) -> SecureBuffer {
        match self.direction {
            Some(KeyDirection::Server) => self.slot(2),
            None | Some(KeyDirection::Client) => self.slot(0),
        }
    }

    /// HMAC key for outgoing data.
    pub fn hmac_send_key(&self) -> SecureBuffer {
        match self.direction {
            None | Some(KeyDirection::Server) => self.slot(1),
            Some(KeyDirection::Client) => self.slot(3),
        }
    }

    /// HMAC key for incoming data.
    pub fn hmac_receive_key(&self) -> SecureBuffer {
        match self.direction {
            Some(KeyDirection::Server) => self.slot(3),
            None | Some(KeyDirection::Client) => self.slot(1),
        }
    }

    /// Keys for [`crate::CryptoBox::configure`].
    ///
    /// Cipher keys are included only when `with_cipher` is set; tls-auth
    /// style use needs the HMAC keys alone.
    pub fn crypto_keys(&self, with_cipher: bool) -> CryptoKeys {
        CryptoKeys {
            cipher_enc: with_cipher.then(|| self.cipher_encrypt_key()),
            cipher_dec: with_cipher.then(|| self.cipher_decrypt_key()),
            hmac_enc: self.hmac_send_key(),
            hmac_dec: self.hmac_receive_key(),
        }
    }

    fn slot(&self, index: usize) -> SecureBuffer {
        let start = index * SLOT_LEN;
        SecureBuffer::from_slice(&self.data.as_slice()[start..start + SLOT_LEN])
    }
}

impl std::fmt::Debug for StaticKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKey")
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}
