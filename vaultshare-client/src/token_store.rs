//! Owned holder of the access/refresh credential pair.
//!
//! One store is shared (via `Arc`) by everything that issues requests for a
//! given login. Every mutation bumps a generation counter that is read
//! together with the credentials, which lets the session manager tell whether
//! a refresh already happened while a request was in flight.

use crate::error::{ClientError, ClientResult};
use crate::types::{Credentials, User};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Credentials plus the generation they were read at.
#[derive(Clone, Debug)]
pub struct TokenSnapshot {
    pub credentials: Option<Credentials>,
    pub generation: u64,
}

impl TokenSnapshot {
    pub fn access_token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.access_token.as_str())
    }
}

/// On-disk form of a session.
#[derive(Serialize, Deserialize)]
struct PersistedSession {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Default)]
struct StoreState {
    credentials: Option<Credentials>,
    user: Option<User>,
    generation: u64,
}

pub struct TokenStore {
    state: RwLock<StoreState>,
    path: Option<PathBuf>,
}

impl TokenStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            path: None,
        }
    }

    /// Opens a store persisted at `path`, loading a saved session if present.
    pub async fn init(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let mut state = StoreState::default();

        match tokio::fs::read_to_string(&path).await {
            Ok(json) => {
                // A `null` document is a logged-out tombstone.
                let saved: Option<PersistedSession> = serde_json::from_str(&json)
                    .map_err(|e| ClientError::Storage(format!("corrupt session file: {e}")))?;
                if let Some(saved) = saved {
                    state.credentials = Some(Credentials {
                        access_token: saved.access_token,
                        refresh_token: saved.refresh_token,
                    });
                    state.user = saved.user;
                    debug!("restored session from {}", path.display());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ClientError::Storage(e.to_string())),
        }

        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn snapshot(&self) -> TokenSnapshot {
        let state = self.state.read().await;
        TokenSnapshot {
            credentials: state.credentials.clone(),
            generation: state.generation,
        }
    }

    pub async fn credentials(&self) -> Option<Credentials> {
        self.state.read().await.credentials.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .credentials
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .credentials
            .as_ref()
            .map(|c| c.refresh_token.clone())
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.credentials.is_some()
    }

    /// Replaces the credential pair wholesale (login, registration).
    ///
    /// The new pair is written to disk first; if that fails the store keeps
    /// its previous contents.
    pub async fn update(&self, credentials: Credentials, user: Option<User>) -> ClientResult<()> {
        let mut state = self.state.write().await;
        self.persist(&credentials, user.as_ref()).await?;
        state.credentials = Some(credentials);
        state.user = user;
        state.generation += 1;
        Ok(())
    }

    /// Installs a refreshed access token, plus the rotated refresh token if
    /// the server issued one.
    ///
    /// Returns `false` without changing anything if the store was cleared in
    /// the meantime. The refreshed pair stays in memory even when persisting
    /// it fails, since the server may already have retired the old refresh
    /// token.
    pub async fn update_access(
        &self,
        access_token: String,
        rotated_refresh: Option<String>,
    ) -> ClientResult<bool> {
        let mut state = self.state.write().await;
        let Some(creds) = state.credentials.as_mut() else {
            return Ok(false);
        };
        creds.access_token = access_token;
        if let Some(refresh) = rotated_refresh {
            creds.refresh_token = refresh;
        }
        let creds = creds.clone();
        state.generation += 1;
        self.persist(&creds, state.user.as_ref()).await?;
        Ok(true)
    }

    /// Drops credentials and the persisted session. Idempotent.
    ///
    /// Memory is cleared unconditionally. If the session file cannot be
    /// removed it is overwritten with a tombstone that [`init`](Self::init)
    /// reads as logged out; only when both fail is `Storage` returned.
    pub async fn clear(&self) -> ClientResult<()> {
        let mut state = self.state.write().await;
        let had_credentials = state.credentials.take().is_some();
        state.user = None;
        if had_credentials {
            state.generation += 1;
        }

        let Some(path) = &self.path else {
            return Ok(());
        };
        let remove_err = match tokio::fs::remove_file(path).await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => e,
        };

        warn!(
            "could not remove session file {}: {remove_err}; writing tombstone",
            path.display()
        );
        tokio::fs::write(path, "null").await.map_err(|e| {
            ClientError::Storage(format!(
                "session file {} survives logout: remove failed ({remove_err}), overwrite failed ({e})",
                path.display()
            ))
        })
    }

    async fn persist(&self, credentials: &Credentials, user: Option<&User>) -> ClientResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ClientError::Storage(e.to_string()))?;
            }
        }

        let saved = PersistedSession {
            access_token: credentials.access_token.clone(),
            refresh_token: credentials.refresh_token.clone(),
            user: user.cloned(),
        };
        let json = serde_json::to_string_pretty(&saved)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| ClientError::Storage(e.to_string()))
    }
}
