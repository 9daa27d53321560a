//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the VaultShare API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("session expired, re-authentication required")]
    SessionExpired,

    #[error("authentication required")]
    AuthRequired,

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("request rejected: {0}")]
    Validation(serde_json::Value),

    #[error("access token rejected after refresh")]
    Unauthorized,

    #[error("not the owner of file {0}")]
    NotOwner(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("share link expired")]
    Expired,

    #[error("share link is invalid or has expired")]
    LinkUnavailable,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("download response carried no encryption key")]
    MissingKeyHeader,

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("file too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("session storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] vaultshare_crypto::CryptoError),
}

impl ClientError {
    /// True when the caller has to log in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::AuthRequired)
    }
}
