//! Authenticated encryption for key wrapping.
//!
//! Wrapped form is `nonce || ciphertext || tag`, with ChaCha20-Poly1305
//! supplying the ciphertext-then-tag portion as a single opaque blob.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};

use crate::crypto::rng::random_array;
use crate::error::{Error, Result};

const NONCE_LEN: usize = 12;

/// Encrypt `plaintext` under `key` with a fresh random nonce, returning
/// `nonce || ciphertext || tag`.
pub fn wrap_bytes(key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce_bytes: [u8; NONCE_LEN] = random_array();
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .expect("chacha20poly1305 encryption over an in-memory buffer cannot fail");

    let mut wrapped = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    wrapped.extend_from_slice(&nonce_bytes);
    wrapped.extend_from_slice(&ciphertext);
    wrapped
}

/// Decrypt a blob produced by [`wrap_bytes`], verifying the AEAD tag.
pub fn unwrap_bytes(key: &[u8; 32], wrapped: &[u8]) -> Result<Vec<u8>> {
    if wrapped.len() < NONCE_LEN {
        return Err(Error::Integrity("wrapped key material too short".into()));
    }
    let (nonce_bytes, ciphertext) = wrapped.split_at(NONCE_LEN);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| Error::Integrity("AEAD tag verification failed".into()))
}
