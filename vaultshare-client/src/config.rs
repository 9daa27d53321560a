//! Client configuration.

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// MIME types the backend accepts for upload.
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &[
    "text/plain",
    "text/csv",
    "application/json",
    "image/png",
    "image/jpeg",
    "image/gif",
    "application/pdf",
    "video/mp4",
    "video/x-msvideo",
    "audio/mpeg",
    "audio/wav",
];

/// Configuration for the VaultShare client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API, including the `/api` prefix.
    pub api_base_url: String,

    /// Per-request timeout applied to the HTTP client.
    pub request_timeout_secs: u64,

    /// Largest stored upload the server accepts, measured on the ciphertext.
    pub max_upload_bytes: u64,

    /// MIME types accepted for upload.
    pub allowed_mime_types: Vec<String>,

    /// Where the session is persisted between runs. `None` keeps it in memory.
    pub token_store_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            request_timeout_secs: 30,
            max_upload_bytes: 5 * 1024 * 1024, // 5 MiB
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            token_store_path: None,
        }
    }
}

impl ClientConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ClientResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Config pointed at a local mock server.
    pub fn for_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(ClientError::Config("api_base_url is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "api_base_url must be http(s): {url}"
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ClientError::Config(
                "max_upload_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Joins `path` onto the base URL without doubling slashes.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn is_mime_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|m| m == mime_type)
    }
}
