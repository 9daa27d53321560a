//! Per-file symmetric keys and their transport encoding.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Raw key material for one file.
///
/// Lives only in memory and is wiped on drop. Use [`export_key`] to move
/// it across the wire.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Wraps existing key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// A key in its transport form: standard base64 of the raw bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct ExportedKey(String);

impl ExportedKey {
    /// Wraps an encoded key received from elsewhere. No validation happens
    /// until [`import_key`].
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ExportedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExportedKey([REDACTED])")
    }
}

/// Generates a fresh key from the OS CSPRNG.
pub fn generate_key() -> SymmetricKey {
    let mut bytes = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut bytes);
    let key = SymmetricKey::from_bytes(bytes);
    bytes.zeroize();
    key
}

/// Encodes a key for transport.
pub fn export_key(key: &SymmetricKey) -> ExportedKey {
    ExportedKey(STANDARD.encode(key.as_bytes()))
}

/// Decodes a transported key.
///
/// Fails on malformed base64 or any decoded length other than [`KEY_SIZE`].
pub fn import_key(exported: &ExportedKey) -> CryptoResult<SymmetricKey> {
    let mut decoded = STANDARD
        .decode(exported.as_str().trim())
        .map_err(|e| CryptoError::KeyImport(format!("invalid base64: {e}")))?;

    if decoded.len() != KEY_SIZE {
        let actual = decoded.len();
        decoded.zeroize();
        return Err(CryptoError::KeyImport(format!(
            "expected {KEY_SIZE} key bytes, got {actual}"
        )));
    }

    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&decoded);
    decoded.zeroize();
    let key = SymmetricKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}
