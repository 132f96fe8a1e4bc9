//! Fuzz target for envelope parsing
//!
//! Feeds adversarial envelopes to a configured receiver and checks sealed
//! envelopes against mutation.
//!
//! # Strategy
//!
//! - Every supported cipher/digest pair plus HMAC-only suites
//! - Arbitrary keys, plaintexts and additional data
//! - Raw attacker-controlled envelopes of any length
//! - Single-byte mutations of genuine envelopes
//!
//! # Invariants
//!
//! - decrypt/verify never panic on arbitrary input
- decrypt and verify fail identically on forged input
//! - Arbitrary input never produces a fatal error
//! - Sealed envelopes open to the original plaintext
//! - Any mutated envelope fails authentication

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tunnelseal_buffer::SecureBuffer;
use tunnelseal_crypto::{
    CbcEngine, Cipher, CryptoError, CryptoFlags, Digest, FixedIv, Suite,
};

#[derive(Debug, Clone, Arbitrary)]
struct EnvelopeScenario {
    /// Index into the cipher list; out of range selects HMAC-only
    cipher: u8,
    /// Index into the digest list
    digest: u8,
    /// Key material, repeated to fill both keys
    key_seed: [u8; 64],
    /// Plaintext to seal
    plaintext: Vec<u8>,
    /// Additional data bound to the tag
    ad: Vec<u8>,
    /// IV block for deterministic sealing
    iv: [u8; 16],
    /// Attacker-supplied envelope
    raw: Vec<u8>,
    /// Mutation applied to a genuine envelope
    flip_at: u16,
    flip_mask: u8,
}

fn suite(scenario: &EnvelopeScenario) -> Suite {
    let digest = Digest::ALL[scenario.digest as usize % Digest::ALL.len()];
    match Cipher::ALL.get(scenario.cipher as usize) {
        Some(&cipher) => Suite::Authenticated { cipher, digest },
        None => Suite::MacOnly { digest },
    }
}

fuzz_target!(|scenario: EnvelopeScenario| {
    let suite = suite(&scenario);
    let cipher_key = || suite.cipher().map(|_| SecureBuffer::from_slice(&scenario.key_seed));
    let hmac_key = || SecureBuffer::from_slice(&scenario.key_seed);

    let mut sender = CbcEngine::new(suite);
    sender.configure_encryption(cipher_key(), hmac_key()).unwrap();
    let mut receiver = CbcEngine::new(suite);
    receiver.configure_decryption(cipher_key(), hmac_key()).unwrap();

    let flags = CryptoFlags::with_ad(&scenario.ad);

    // INVARIANT 1: arbitrary input is rejected per packet, never fatally,
    // and decrypt and verify reject it the same way
    let decrypted = receiver.decrypt(&scenario.raw, &flags);
    let verified = receiver.verify(&scenario.raw, &flags);
    if let Err(err) = &decrypted {
        assert!(!err.is_fatal(), "forged envelope produced fatal decrypt error: {err}");
    }
    if let Err(err) = &verified {
        assert!(!err.is_fatal(), "forged envelope produced fatal verify error: {err}");
    }
    match (&decrypted, &verified) {
        (Err(decrypt_err), Err(verify_err)) => assert_eq!(decrypt_err, verify_err),
        (Ok(_), Ok(())) => {},
        _ => panic!("decrypt and verify disagree: {decrypted:?} vs {verified:?}"),
    }

    // INVARIANT 2: roundtrip
    let envelope = sender
        .encrypt_with_iv(&scenario.plaintext, &flags, &FixedIv::new(&scenario.iv))
        .unwrap();
    assert_eq!(envelope.len(), suite.encryption_capacity(scenario.plaintext.len()));
    let opened = receiver.decrypt(&envelope, &flags).unwrap();
    assert_eq!(opened.as_slice(), scenario.plaintext.as_slice());

    // INVARIANT 3: mutation is detected before decryption
    if scenario.flip_mask != 0 {
        let mut mutated = envelope.clone();
        let index = scenario.flip_at as usize % mutated.len();
        mutated[index] ^= scenario.flip_mask;
        assert_eq!(receiver.decrypt(&mutated, &flags), Err(CryptoError::AuthenticationFailed));
        assert_eq!(receiver.verify(&mutated, &flags), Err(CryptoError::AuthenticationFailed));
    }
});
