//! VaultShare API client.
//!
//! Provides:
//! - An owned token store with optional on-disk persistence
//! - A request pipeline that refreshes expired access tokens single-flight
//!   and retries each request at most once
//! - End-to-end encrypted upload and download (keys minted per file)
//! - Time-limited, permission-scoped share links

pub mod config;
pub mod error;
pub mod files;
pub mod session;
pub mod sharing;
pub mod telemetry;
pub mod token_store;
pub mod types;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use files::FileService;
pub use session::{MultipartField, RequestBody, SessionManager};
pub use sharing::ShareManager;
pub use token_store::{TokenSnapshot, TokenStore};
pub use types::*;
