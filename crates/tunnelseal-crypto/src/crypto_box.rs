//! One-shot configuration of a bidirectional engine

use serde::{Deserialize, Serialize};
use tunnelseal_buffer::SecureBuffer;

use crate::{
    algorithm::{Cipher, Digest, Suite},
    cbc::CbcEngine,
    error::Result,
};

/// Algorithm selection, embeddable in caller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoOptions {
    /// Block cipher; `None` selects HMAC-only envelopes
    #[serde(default)]
    pub cipher: Option<Cipher>,
    /// HMAC digest
    pub digest: Digest,
}

impl CryptoOptions {
    /// Suite described by these options.
    pub fn suite(&self) -> Suite {
        match self.cipher {
            Some(cipher) => Suite::Authenticated { cipher, digest: self.digest },
            None => Suite::MacOnly { digest: self.digest },
        }
    }
}

/// Key material for both directions of one peer.
#[derive(Debug, Clone, Default)]
pub struct CryptoKeys {
    /// Cipher key for outgoing envelopes
    pub cipher_enc: Option<SecureBuffer>,
    /// Cipher key for incoming envelopes
    pub cipher_dec: Option<SecureBuffer>,
    /// HMAC key for outgoing envelopes
    pub hmac_enc: SecureBuffer,
    /// HMAC key for incoming envelopes
    pub hmac_dec: SecureBuffer,
}

/// Engine with both directions configured from one set of options.
#[derive(Debug)]
pub struct CryptoBox {
    engine: CbcEngine,
}

impl CryptoBox {
    /// Build and configure the engine. Keys are consumed.
    ///
    /// # Errors
    ///
    /// Any configuration error from [`CbcEngine::configure_encryption`] or
    /// [`CbcEngine::configure_decryption`].
    pub fn configure(options: &CryptoOptions, keys: CryptoKeys) -> Result<Self> {
        let CryptoKeys { cipher_enc, cipher_dec, hmac_enc, hmac_dec } = keys;

        let mut engine = CbcEngine::new(options.suite());
        engine.configure_encryption(cipher_enc, hmac_enc)?;
        engine.configure_decryption(cipher_dec, hmac_dec)?;

        Ok(Self { engine })
    }

    /// The configured engine.
    pub fn engine(&self) -> &CbcEngine {
        &self.engine
    }

    /// Algorithms in use.
    pub fn suite(&self) -> Suite {
        self.engine.suite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CryptoError, cbc::CryptoFlags};

    fn key(hex_key: &str) -> SecureBuffer {
        SecureBuffer::from(hex::decode(hex_key).unwrap())
    }

    fn client_keys() -> CryptoKeys {
        CryptoKeys {
            cipher_enc: Some(key("634a4d2d459d606c8e6abbec168fdcd1871462eaa2eaed84c8f403bdf8c7da73")),
            cipher_dec: Some(key("7d81b5774cc35fe0a42b38aa053f1335fd4a22d721880433bbb20ae1f2d88315")),
            hmac_enc: key("b2d186b3b377685506fa39d85d38da16c2ecc0d631bda64f9d8f5a8d073f18aa"),
            hmac_dec: key("b97ade23e49ea9e7de86784d1ed5fa356df5f7fa1d163e5537efa8d4ba61239d"),
        }
    }

    fn server_keys() -> CryptoKeys {
        let CryptoKeys { cipher_enc, cipher_dec, hmac_enc, hmac_dec } = client_keys();
        CryptoKeys { cipher_enc: cipher_dec, cipher_dec: cipher_enc, hmac_enc: hmac_dec, hmac_dec: hmac_enc }
    }

    fn mac_only(keys: CryptoKeys) -> CryptoKeys {
        CryptoKeys { cipher_enc: None, cipher_dec: None, ..keys }
    }

    #[test]
    fn client_server_cbc_roundtrip() {
        let options = CryptoOptions { cipher: Some(Cipher::Aes128Cbc), digest: Digest::Sha256 };
        let client = CryptoBox::configure(&options, client_keys()).unwrap();
        let server = CryptoBox::configure(&options, server_keys()).unwrap();
        let flags = CryptoFlags::default();

        let plain = hex::decode("00112233445566778899").unwrap();
        let encrypted = client.engine().encrypt(&plain, &flags).unwrap();
        let decrypted = server.engine().decrypt(&encrypted, &flags).unwrap();

        assert_eq!(decrypted.as_slice(), plain.as_slice());
    }

    #[test]
    fn client_server_mac_only_validates() {
        let options = CryptoOptions { cipher: None, digest: Digest::Sha256 };
        let client = CryptoBox::configure(&options, mac_only(client_keys())).unwrap();
        let server = CryptoBox::configure(&options, mac_only(server_keys())).unwrap();
        let flags = CryptoFlags::default();

        let plain = hex::decode("00112233445566778899").unwrap();
        let encrypted = client.engine().encrypt(&plain, &flags).unwrap();

        assert!(server.engine().verify(&encrypted, &flags).is_ok());
    }

    #[test]
    fn own_envelope_fails_authentication() {
        let options = CryptoOptions { cipher: Some(Cipher::Aes128Cbc), digest: Digest::Sha256 };
        let client = CryptoBox::configure(&options, client_keys()).unwrap();
        let flags = CryptoFlags::default();

        let envelope = client.engine().encrypt(b"loopback", &flags).unwrap();
        assert_eq!(client.engine().verify(&envelope, &flags), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn hmac_keys_shorter_than_digest_are_rejected() {
        let options = CryptoOptions { cipher: Some(Cipher::Aes256Cbc), digest: Digest::Sha512 };
        let result = CryptoBox::configure(&options, client_keys());

        assert!(matches!(result, Err(CryptoError::InvalidKeyLength { expected: 64, actual: 32 })));
    }

    #[test]
    fn cipher_keys_with_mac_only_options_fail() {
        let options = CryptoOptions { cipher: None, digest: Digest::Sha1 };
        let result = CryptoBox::configure(&options, client_keys());

        assert!(matches!(result, Err(CryptoError::UnexpectedCipherKey)));
    }

    #[test]
    fn options_deserialize_from_openvpn_names() {
        let options = CryptoOptions { cipher: Some(Cipher::Aes256Cbc), digest: Digest::Sha1 };
        let mut encoded = Vec::new();
        ciborium::into_writer(&options, &mut encoded).unwrap();

        let decoded: CryptoOptions = ciborium::from_reader(encoded.as_slice()).unwrap();
        assert_eq!(decoded, options);
        assert_eq!(decoded.suite().to_string(), "AES-256-CBC/SHA1");
    }
}
