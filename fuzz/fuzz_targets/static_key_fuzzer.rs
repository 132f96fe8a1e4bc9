//! Fuzz target for static key file parsing
//!
//! # Invariants
//!
//! - Parsing arbitrary text never panics
//! - A parsed key is always 256 bytes
//! - Client and server views of one key mirror each other

#![no_main]

use libfuzzer_sys::fuzz_target;
use tunnelseal_crypto::{KeyDirection, StaticKey};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(client) = StaticKey::from_pem(text, Some(KeyDirection::Client)) else {
        return;
    };
    assert_eq!(client.as_slice().len(), 256);

    let server = StaticKey::from_bytes(client.as_slice(), Some(KeyDirection::Server)).unwrap();
    assert_eq!(client.hmac_send_key(), server.hmac_receive_key());
    assert_eq!(client.cipher_encrypt_key(), server.cipher_decrypt_key());
});
