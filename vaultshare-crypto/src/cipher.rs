//! AES-256-GCM file encryption.
//!
//! Wire format of an [`EncryptedPayload`]:
//!
//! ```text
//! byte[0..12)   nonce
//! byte[12..end) ciphertext || 16-byte tag
//! ```
//!
//! This matches what WebCrypto `AES-GCM` produces when the IV is prepended,
//! so payloads written by the browser client decrypt here and vice versa.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{ExportedKey, SymmetricKey, export_key, generate_key, import_key};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;

/// Nonce length for AES-GCM.
pub const NONCE_SIZE: usize = 12;

/// Authentication tag length appended by AES-GCM.
pub const TAG_SIZE: usize = 16;

/// Nonce followed by ciphertext and tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedPayload(Vec<u8>);

impl EncryptedPayload {
    /// Wraps bytes received from storage. Structure is checked on decrypt.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The leading nonce, or `None` if the payload is truncated.
    pub fn nonce(&self) -> Option<&[u8]> {
        self.0.get(..NONCE_SIZE)
    }

    /// Ciphertext including the trailing tag, or `None` if truncated.
    pub fn ciphertext(&self) -> Option<&[u8]> {
        self.0.get(NONCE_SIZE..)
    }
}

fn cipher_for(key: &SymmetricKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

/// Encrypts `plaintext` under `key` with a freshly drawn nonce.
///
/// Two calls on identical input yield different payloads.
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> CryptoResult<EncryptedPayload> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let sealed = cipher_for(key)
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(EncryptedPayload(out))
}

/// Decrypts a payload, verifying its tag.
pub fn decrypt(payload: &EncryptedPayload, key: &SymmetricKey) -> CryptoResult<Vec<u8>> {
    let (Some(nonce), Some(ciphertext)) = (payload.nonce(), payload.ciphertext()) else {
        return Err(CryptoError::Authentication);
    };
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::Authentication);
    }

    cipher_for(key)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Authentication)
}

/// Encrypts one file under a key minted for it alone.
pub fn encrypt_file(plaintext: &[u8]) -> CryptoResult<(EncryptedPayload, ExportedKey)> {
    let key = generate_key();
    let payload = encrypt(plaintext, &key)?;
    Ok((payload, export_key(&key)))
}

/// Imports the transported key and decrypts the payload with it.
pub fn decrypt_file(payload: &EncryptedPayload, exported: &ExportedKey) -> CryptoResult<Vec<u8>> {
    let key = import_key(exported)?;
    decrypt(payload, &key)
}
