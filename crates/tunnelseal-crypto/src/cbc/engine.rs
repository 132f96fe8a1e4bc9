//! Stateful per-direction CBC + HMAC engine
//!
//! Keys are bound once per direction. After that every call is a pure
//! function of (input bytes, flags, configured keys).

use std::fmt;

use tunnelseal_buffer::SecureBuffer;

use super::{
    flags::CryptoFlags,
    iv::{IvSource, SystemIv},
};
use crate::{
    algorithm::Suite,
    error::{CryptoError, Result},
};

/// Side of the envelope a key pair is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Keys used by `encrypt`
    Encryption,
    /// Keys used by `decrypt` and `verify`
    Decryption,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encryption => f.write_str("encryption"),
            Self::Decryption => f.write_str("decryption"),
        }
    }
}

/// Key pair bound to one direction.
struct DirectionKeys {
    /// Truncated to the cipher key length. `None` only for MAC-only suites
    /// or verify-only receivers.
    cipher_key: Option<SecureBuffer>,
    /// Truncated to the digest length
    hmac_key: SecureBuffer,
}

/// CBC + HMAC envelope engine.
///
/// Encryption and decryption keys are independent; unidirectional use is
/// valid. Methods other than `configure_*` take `&self`, so a configured
/// engine can be shared across threads.
///
/// # Security
///
/// - Keys are held in [`SecureBuffer`]s and wiped when the engine drops
/// - `decrypt` and `verify` fail identically on a bad tag, and decryption
///   never starts before the tag verified
/// - `encrypt` draws a fresh IV from the OS CSPRNG unless the caller injects
///   another [`IvSource`]
pub struct CbcEngine {
    suite: Suite,
    encryption: Option<DirectionKeys>,
    decryption: Option<DirectionKeys>,
}

impl CbcEngine {
    /// Unconfigured engine for `suite`.
    pub fn new(suite: Suite) -> Self {
        Self { suite, encryption: None, decryption: None }
    }

    /// Unconfigured engine from OpenVPN algorithm names.
    ///
    /// # Errors
    ///
    /// - `UnsupportedAlgorithm`: if either name is unknown
    pub fn from_names(cipher: Option<&str>, digest: &str) -> Result<Self> {
        Ok(Self::new(Suite::from_names(cipher, digest)?))
    }

    /// Algorithms in use.
    pub fn suite(&self) -> Suite {
        self.suite
    }

    /// True once `configure_encryption` succeeded.
    pub fn is_encryption_configured(&self) -> bool {
        self.encryption.is_some()
    }

    /// True once `configure_decryption` succeeded.
    pub fn is_decryption_configured(&self) -> bool {
        self.decryption.is_some()
    }

    /// Bind the keys used by [`Self::encrypt`].
    ///
    /// Keys longer than the algorithm needs are truncated.
    ///
    /// # Errors
    ///
    /// - `AlreadyConfigured`: if encryption keys were bound before
    /// - `MissingCipherKey`: if the suite has a cipher and `cipher_key` is
    ///   `None`
    /// - `UnexpectedCipherKey`: if the suite has no cipher and `cipher_key`
    ///   is `Some`
    /// - `InvalidKeyLength`: if a key is too short
    pub fn configure_encryption(
        &mut self,
        cipher_key: Option<SecureBuffer>,
        hmac_key: SecureBuffer,
    ) -> Result<()> {
        if self.encryption.is_some() {
            return Err(CryptoError::AlreadyConfigured { direction: Direction::Encryption });
        }

        let keys = self.bind_keys(cipher_key, hmac_key)?;
        if self.suite.cipher().is_some() && keys.cipher_key.is_none() {
            return Err(CryptoError::MissingCipherKey);
        }

        self.encryption = Some(keys);
        tracing::debug!(suite = %self.suite, direction = %Direction::Encryption, "configured keys");
        Ok(())
    }

    /// Bind the keys used by [`Self::decrypt`] and [`Self::verify`].
    ///
    /// A cipher suite may be configured without cipher key; such an engine
    /// can `verify` but not `decrypt`.
    ///
    /// # Errors
    ///
    /// - `AlreadyConfigured`: if decryption keys were bound before
    /// - `UnexpectedCipherKey`: if the suite has no cipher and `cipher_key`
    ///   is `Some`
    /// - `InvalidKeyLength`: if a key is too short
    pub fn configure_decryption(
        &mut self,
        cipher_key: Option<SecureBuffer>,
        hmac_key: SecureBuffer,
    ) -> Result<()> {
        if self.decryption.is_some() {
            return Err(CryptoError::AlreadyConfigured { direction: Direction::Decryption });
        }

        let keys = self.bind_keys(cipher_key, hmac_key)?;
        self.decryption = Some(keys);
        tracing::debug!(suite = %self.suite, direction = %Direction::Decryption, "configured keys");
        Ok(())
    }

    /// Seal `plaintext` with a fresh random IV.
    ///
    /// Returns `tag || IV || ciphertext`, or `tag || plaintext` without
    /// cipher.
    ///
    /// # Errors
    ///
    /// - `NotConfigured`: if encryption keys were never bound
    /// - `RandomSource`: if the OS RNG failed
    pub fn encrypt(&self, plaintext: &[u8], flags: &CryptoFlags<'_>) -> Result<Vec<u8>> {
        self.encrypt_with_iv(plaintext, flags, &SystemIv)
    }

    /// Seal `plaintext` with an IV drawn from `iv_source`.
    ///
    /// # Errors
    ///
    /// - `NotConfigured`: if encryption keys were never bound
    /// - `RandomSource`: if `iv_source` failed
    pub fn encrypt_with_iv<S>(
        &self,
        plaintext: &[u8],
        flags: &CryptoFlags<'_>,
        iv_source: &S,
    ) -> Result<Vec<u8>>
    where
        S: IvSource + ?Sized,
    {
        let keys = self
            .encryption
            .as_ref()
            .ok_or(CryptoError::NotConfigured { direction: Direction::Encryption })?;

        let digest_len = self.suite.digest_len();
        let mut envelope = Vec::with_capacity(self.suite.encryption_capacity(plaintext.len()));
        envelope.resize(digest_len, 0);

        match self.suite {
            Suite::Authenticated { cipher, .. } => {
                let cipher_key = keys.cipher_key.as_ref().ok_or(CryptoError::MissingCipherKey)?;
                envelope.resize(digest_len + cipher.block_len(), 0);
                iv_source.fill_iv(&mut envelope[digest_len..])?;

                let ciphertext =
                    cipher.encrypt(cipher_key.as_slice(), &envelope[digest_len..], plaintext)?;
                envelope.extend_from_slice(&ciphertext);
            },
            Suite::MacOnly { .. } => envelope.extend_from_slice(plaintext),
        }

        let body = &envelope[digest_len..];
        let tag = self.suite.digest().sign(keys.hmac_key.as_slice(), &[flags.ad, body]);
        envelope[..digest_len].copy_from_slice(&tag);

        tracing::trace!(
            plaintext_len = plaintext.len(),
            envelope_len = envelope.len(),
            "sealed envelope"
        );
        Ok(envelope)
    }

    /// Authenticate and open an envelope.
    ///
    /// # Errors
    ///
    /// - `NotConfigured`: if decryption keys were never bound
    /// - `MissingCipherKey`: if only the HMAC key was bound for a cipher suite
    /// - `EnvelopeTooShort`: if the envelope cannot hold the tag
    /// - `AuthenticationFailed`: if the tag does not match
    /// - `BadPadding`: if the authenticated ciphertext is malformed
    ///
    /// Forged input fails exactly as in [`Self::verify`].
    pub fn decrypt(&self, envelope: &[u8], flags: &CryptoFlags<'_>) -> Result<SecureBuffer> {
        let keys = self.decryption_keys()?;

        match self.suite {
            Suite::Authenticated { cipher, .. } => {
                let cipher_key = keys.cipher_key.as_ref().ok_or(CryptoError::MissingCipherKey)?;
                let body = self.authenticate(keys, envelope, flags, self.suite.digest_len())?;

                // Tagged by a keyed peer but too short for IV and one block
                let block_len = cipher.block_len();
                if body.len() < 2 * block_len || body.len() % block_len != 0 {
                    return Err(CryptoError::BadPadding);
                }

                let (iv, ciphertext) = body.split_at(block_len);
                let plaintext = cipher.decrypt(cipher_key.as_slice(), iv, ciphertext)?;
                tracing::trace!(
                    envelope_len = envelope.len(),
                    plaintext_len = plaintext.len(),
                    "opened envelope"
                );
                Ok(plaintext)
            },
            Suite::MacOnly { .. } => {
                let body = self.authenticate(keys, envelope, flags, self.suite.overhead())?;
                tracing::trace!(envelope_len = envelope.len(), "opened envelope");
                Ok(SecureBuffer::from_slice(body))
            },
        }
    }

    /// Check the tag without decrypting. Accepts both envelope layouts and
    /// needs only the HMAC key.
    ///
    /// # Errors
    ///
    /// - `NotConfigured`: if decryption keys were never bound
    /// - `EnvelopeTooShort`: if the envelope cannot hold the tag
    /// - `AuthenticationFailed`: if the tag does not match
    pub fn verify(&self, envelope: &[u8], flags: &CryptoFlags<'_>) -> Result<()> {
        let keys = self.decryption_keys()?;
        self.authenticate(keys, envelope, flags, self.suite.digest_len())?;
        Ok(())
    }

    fn decryption_keys(&self) -> Result<&DirectionKeys> {
        self.decryption
            .as_ref()
            .ok_or(CryptoError::NotConfigured { direction: Direction::Decryption })
    }

    /// Verify the leading tag and return the bytes it covers.
    fn authenticate<'e>(
        &self,
        keys: &DirectionKeys,
        envelope: &'e [u8],
        flags: &CryptoFlags<'_>,
        min_len: usize,
    ) -> Result<&'e [u8]> {
        if envelope.len() < min_len {
            tracing::debug!(envelope_len = envelope.len(), min_len, "envelope too short");
            return Err(CryptoError::EnvelopeTooShort { expected: min_len, actual: envelope.len() });
        }

        let (tag, body) = envelope.split_at(self.suite.digest_len());
        if !self.suite.digest().verify(keys.hmac_key.as_slice(), &[flags.ad, body], tag) {
            tracing::debug!(envelope_len = envelope.len(), "HMAC verification failed");
            return Err(CryptoError::AuthenticationFailed);
        }

        Ok(body)
    }

    fn bind_keys(
        &self,
        cipher_key: Option<SecureBuffer>,
        hmac_key: SecureBuffer,
    ) -> Result<DirectionKeys> {
        let cipher_key = match (self.suite.cipher(), cipher_key) {
            (None, Some(_)) => return Err(CryptoError::UnexpectedCipherKey),
            (_, None) => None,
            (Some(cipher), Some(key)) => Some(fit_key(key, cipher.key_len())?),
        };
        let hmac_key = fit_key(hmac_key, self.suite.digest_len())?;

        Ok(DirectionKeys { cipher_key, hmac_key })
    }
}

impl fmt::Debug for CbcEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CbcEngine")
            .field("suite", &self.suite)
            .field("encryption_configured", &self.is_encryption_configured())
            .field("decryption_configured", &self.is_decryption_configured())
            .finish()
    }
}

/// Truncate `key` to `len` bytes, rejecting shorter keys.
fn fit_key(mut key: SecureBuffer, len: usize) -> Result<SecureBuffer> {
    if key.len() < len {
        return Err(CryptoError::InvalidKeyLength { expected: len, actual: key.len() });
    }
    key.truncate(len)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::{super::iv::FixedIv, *};
    use crate::algorithm::{Cipher, Digest};

    const PLAINTEXT: &str = "00112233ffddaa";
    const PACKET_ID: [u8; 4] = [0x56, 0x34, 0x12, 0x00];

    const MAC_ONLY_ENVELOPE: &str =
        "8dd324c81ca32f52e4aa1aa35139deba799a68460e80b0e5ac8bceb043edf6e500112233ffddaa";
    const CBC_ENVELOPE: &str = "fea3fe87ee68eb21c697e62d3c29f7bea2f5b457d9a7fa66291322fc9c2fe6f7\
                                00000000000000000000000000000000\
                                ebe197e706c3c5dcad026f4e3af1048b";

    fn zero_key() -> SecureBuffer {
        SecureBuffer::zeroed(32)
    }

    fn cbc_suite() -> Suite {
        Suite::Authenticated { cipher: Cipher::Aes128Cbc, digest: Digest::Sha256 }
    }

    fn mac_only_suite() -> Suite {
        Suite::MacOnly { digest: Digest::Sha256 }
    }

    fn configured(suite: Suite) -> CbcEngine {
        let cipher_key = suite.cipher().map(|_| zero_key());
        let mut engine = CbcEngine::new(suite);
        engine.configure_encryption(cipher_key.clone(), zero_key()).unwrap();
        engine.configure_decryption(cipher_key, zero_key()).unwrap();
        engine
    }

    #[test]
    fn mac_only_known_vector() {
        let engine = configured(mac_only_suite());
        let plaintext = hex::decode(PLAINTEXT).unwrap();
        let flags = CryptoFlags::new(&PACKET_ID, &[]);

        let envelope = engine.encrypt(&plaintext, &flags).unwrap();
        assert_eq!(hex::encode(&envelope), MAC_ONLY_ENVELOPE);

        let decrypted = engine.decrypt(&envelope, &flags).unwrap();
        assert_eq!(decrypted.as_slice(), plaintext.as_slice());
        engine.verify(&envelope, &flags).unwrap();
    }

    #[test]
    fn cbc_known_vector() {
        let engine = configured(cbc_suite());
        let plaintext = hex::decode(PLAINTEXT).unwrap();
        let flags = CryptoFlags::new(&PACKET_ID, &[]);

        let envelope = engine.encrypt_with_iv(&plaintext, &flags, &FixedIv::zeroed()).unwrap();
        assert_eq!(hex::encode(&envelope), CBC_ENVELOPE);

        let decrypted = engine.decrypt(&envelope, &flags).unwrap();
        assert_eq!(decrypted.as_slice(), plaintext.as_slice());
        engine.verify(&envelope, &flags).unwrap();
    }

    #[test]
    fn known_vectors_decrypt_from_hex() {
        let flags = CryptoFlags::default();
        let plaintext = hex::decode(PLAINTEXT).unwrap();

        let engine = configured(mac_only_suite());
        let envelope = hex::decode(MAC_ONLY_ENVELOPE).unwrap();
        assert_eq!(engine.decrypt(&envelope, &flags).unwrap().as_slice(), plaintext.as_slice());

        let engine = configured(cbc_suite());
        let envelope = hex::decode(CBC_ENVELOPE).unwrap();
        assert_eq!(engine.decrypt(&envelope, &flags).unwrap().as_slice(), plaintext.as_slice());
    }

    #[test]
    fn envelope_layout_lengths() {
        let engine = configured(cbc_suite());
        let envelope = engine.encrypt(&[0xAB; 20], &CryptoFlags::default()).unwrap();

        assert_eq!(envelope.len(), 32 + 16 + 32);
        assert_eq!(envelope.len(), engine.suite().encryption_capacity(20));
    }

    #[test]
    fn random_ivs_differ() {
        let engine = configured(cbc_suite());
        let flags = CryptoFlags::default();

        let first = engine.encrypt(b"same plaintext", &flags).unwrap();
        let second = engine.encrypt(b"same plaintext", &flags).unwrap();

        assert_ne!(&first[32..48], &second[32..48], "IVs must be fresh per call");
        assert_ne!(first, second);
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        for suite in [cbc_suite(), mac_only_suite()] {
            let engine = configured(suite);
            let flags = CryptoFlags::default();

            let envelope = engine.encrypt(&[], &flags).unwrap();
            assert!(engine.decrypt(&envelope, &flags).unwrap().is_empty());
        }
    }

    #[test]
    fn additional_data_is_authenticated() {
        let engine = configured(cbc_suite());
        let envelope = engine.encrypt(b"payload", &CryptoFlags::with_ad(&[0x48, 0x01])).unwrap();

        assert!(engine.verify(&envelope, &CryptoFlags::with_ad(&[0x48, 0x01])).is_ok());
        assert_eq!(
            engine.verify(&envelope, &CryptoFlags::with_ad(&[0x48, 0x02])),
            Err(CryptoError::AuthenticationFailed)
        );
        assert_eq!(
            engine.decrypt(&envelope, &CryptoFlags::default()),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn additional_data_is_not_emitted() {
        let engine = configured(mac_only_suite());
        let envelope = engine.encrypt(b"payload", &CryptoFlags::with_ad(b"context")).unwrap();

        assert_eq!(envelope.len(), 32 + 7);
        assert_eq!(&envelope[32..], b"payload");
    }

    #[test]
    fn tampered_tag_fails_both_paths() {
        let engine = configured(cbc_suite());
        let flags = CryptoFlags::default();
        let mut envelope = engine.encrypt(b"payload", &flags).unwrap();
        envelope[0] ^= 0x80;

        assert_eq!(engine.verify(&envelope, &flags), Err(CryptoError::AuthenticationFailed));
        assert_eq!(engine.decrypt(&envelope, &flags), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn wrong_hmac_key_fails() {
        let sender = configured(mac_only_suite());
        let mut receiver = CbcEngine::new(mac_only_suite());
        receiver.configure_decryption(None, SecureBuffer::from_slice(&[0x01; 32])).unwrap();

        let envelope = sender.encrypt(b"payload", &CryptoFlags::default()).unwrap();
        let result = receiver.verify(&envelope, &CryptoFlags::default());

        assert_eq!(result, Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn verify_without_cipher_key() {
        let sender = configured(cbc_suite());
        let mut receiver = CbcEngine::new(cbc_suite());
        receiver.configure_decryption(None, zero_key()).unwrap();
        let flags = CryptoFlags::default();

        let envelope = sender.encrypt(b"payload", &flags).unwrap();

        assert!(receiver.verify(&envelope, &flags).is_ok());
        assert_eq!(receiver.decrypt(&envelope, &flags), Err(CryptoError::MissingCipherKey));
    }

    #[test]
    fn encrypt_before_configure_fails() {
        let engine = CbcEngine::new(cbc_suite());
        let result = engine.encrypt(b"payload", &CryptoFlags::default());

        assert_eq!(result, Err(CryptoError::NotConfigured { direction: Direction::Encryption }));
    }

    #[test]
    fn decrypt_and_verify_before_configure_fail() {
        let mut engine = CbcEngine::new(cbc_suite());
        engine.configure_encryption(Some(zero_key()), zero_key()).unwrap();
        let envelope = engine.encrypt(b"payload", &CryptoFlags::default()).unwrap();

        let expected = Err(CryptoError::NotConfigured { direction: Direction::Decryption });
        assert_eq!(engine.verify(&envelope, &CryptoFlags::default()), expected);
        assert_eq!(
            engine.decrypt(&envelope, &CryptoFlags::default()).map(|_| ()),
            Err(CryptoError::NotConfigured { direction: Direction::Decryption })
        );
    }

    #[test]
    fn directions_configure_once() {
        let mut engine = CbcEngine::new(mac_only_suite());
        engine.configure_encryption(None, zero_key()).unwrap();

        assert_eq!(
            engine.configure_encryption(None, zero_key()),
            Err(CryptoError::AlreadyConfigured { direction: Direction::Encryption })
        );
        assert!(!engine.is_decryption_configured());
        engine.configure_decryption(None, zero_key()).unwrap();
        assert!(engine.is_decryption_configured());
    }

    #[test]
    fn encryption_requires_cipher_key() {
        let mut engine = CbcEngine::new(cbc_suite());
        assert_eq!(engine.configure_encryption(None, zero_key()), Err(CryptoError::MissingCipherKey));
        assert!(!engine.is_encryption_configured());
    }

    #[test]
    fn mac_only_rejects_cipher_key() {
        let mut engine = CbcEngine::new(mac_only_suite());
        assert_eq!(
            engine.configure_encryption(Some(zero_key()), zero_key()),
            Err(CryptoError::UnexpectedCipherKey)
        );
        assert_eq!(
            engine.configure_decryption(Some(zero_key()), zero_key()),
            Err(CryptoError::UnexpectedCipherKey)
        );
    }

    #[test]
    fn short_keys_are_rejected() {
        let mut engine = CbcEngine::new(Suite::Authenticated {
            cipher: Cipher::Aes256Cbc,
            digest: Digest::Sha256,
        });

        assert_eq!(
            engine.configure_encryption(Some(SecureBuffer::zeroed(16)), zero_key()),
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 16 })
        );
        assert_eq!(
            engine.configure_encryption(Some(zero_key()), SecureBuffer::zeroed(20)),
            Err(CryptoError::InvalidKeyLength { expected: 32, actual: 20 })
        );
    }

    #[test]
    fn short_envelopes_are_rejected() {
        let engine = configured(cbc_suite());
        let flags = CryptoFlags::default();

        assert_eq!(
            engine.verify(&[0u8; 31], &flags),
            Err(CryptoError::EnvelopeTooShort { expected: 32, actual: 31 })
        );
        assert_eq!(
            engine.decrypt(&[0u8; 31], &flags),
            Err(CryptoError::EnvelopeTooShort { expected: 32, actual: 31 })
        );
    }

    #[test]
    fn forged_envelope_without_full_iv_fails_like_verify() {
        let engine = configured(cbc_suite());
        let flags = CryptoFlags::default();

        // Longer than the tag, shorter than tag + IV
        let forged = [0u8; 40];
        assert_eq!(engine.verify(&forged, &flags), Err(CryptoError::AuthenticationFailed));
        assert_eq!(engine.decrypt(&forged, &flags), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn authenticated_envelope_without_full_iv_is_bad_padding() {
        let engine = configured(cbc_suite());
        let flags = CryptoFlags::default();

        let body = [0xAAu8; 8];
        let mut envelope = Digest::Sha256.sign(&[0u8; 32], &[b"".as_slice(), body.as_slice()]);
        envelope.extend_from_slice(&body);

        assert!(engine.verify(&envelope, &flags).is_ok());
        assert_eq!(engine.decrypt(&envelope, &flags), Err(CryptoError::BadPadding));
    }

    #[test]
    fn authenticated_but_truncated_ciphertext_is_bad_padding() {
        let engine = configured(cbc_suite());
        let flags = CryptoFlags::default();

        // Tag over IV and a ciphertext that is not a whole block
        let mut body = vec![0u8; 16];
        body.extend_from_slice(&[0xAA; 5]);
        let mut envelope = Digest::Sha256.sign(&[0u8; 32], &[b"".as_slice(), body.as_slice()]);
        envelope.extend_from_slice(&body);

        assert!(engine.verify(&envelope, &flags).is_ok());
        assert_eq!(engine.decrypt(&envelope, &flags), Err(CryptoError::BadPadding));
    }

    #[test]
    fn long_keys_are_truncated() {
        let mut long = CbcEngine::new(cbc_suite());
        long.configure_encryption(Some(SecureBuffer::zeroed(64)), SecureBuffer::zeroed(64))
            .unwrap();
        let flags = CryptoFlags::default();

        let envelope = long.encrypt_with_iv(&[0x00, 0x11], &flags, &FixedIv::zeroed()).unwrap();
        let reference =
            configured(cbc_suite()).encrypt_with_iv(&[0x00, 0x11], &flags, &FixedIv::zeroed());

        assert_eq!(Ok(envelope), reference);
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CbcEngine>();
    }

    #[test]
    fn debug_hides_keys() {
        let engine = configured(cbc_suite());
        let rendered = format!("{engine:?}");

        assert!(rendered.contains("encryption_configured: true"));
        assert!(!rendered.contains("hmac_key"));
    }
}
