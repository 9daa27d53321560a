//! Encryption error types.

use thiserror::Error;

/// Result type for encryption operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced by the file encryption engine.
///
/// Decryption never degrades to a partial result: any tag mismatch,
/// truncation or wrong key surfaces as [`CryptoError::Authentication`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("key import failed: {0}")]
    KeyImport(String),

    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,

    #[error("encryption failed: {0}")]
    Encryption(String),
}
