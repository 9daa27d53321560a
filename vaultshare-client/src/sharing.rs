//! Share links: issuing them for owned files and resolving them as a holder.
//!
//! A holder only ever gets a metadata projection from [`ShareManager::resolve`].
//! Ciphertext and key are reachable through [`ShareManager::fetch_payload`],
//! which re-resolves the given token on every call and refuses `view` links
//! before the download endpoint is contacted.

use crate::error::{ClientError, ClientResult};
use crate::files::read_encrypted_body;
use crate::session::{ApiFailure, RequestBody, SessionManager};
use crate::telemetry::fingerprint;
use crate::types::{CreateShareRequest, FileProjection, SharePermission, ShareToken};
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use vaultshare_crypto::{EncryptedPayload, ExportedKey, decrypt_file};

const SECS_PER_HOUR: u64 = 3600;

/// Rejects empty tokens and anything outside the URL-safe base64 alphabet
/// the server issues, so a token can be placed in a query string verbatim.
fn validate_token(token: &str) -> ClientResult<()> {
    if token.is_empty() {
        return Err(ClientError::InvalidArgument("share token is empty".to_string()));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ClientError::InvalidArgument(
            "share token contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Whole hours in `expires_in`; the API only accepts hour granularity.
fn expiry_hours(expires_in: Duration) -> ClientResult<u64> {
    let secs = expires_in.as_secs();
    if secs == 0 || secs % SECS_PER_HOUR != 0 || expires_in.subsec_nanos() != 0 {
        return Err(ClientError::InvalidArgument(format!(
            "expiry must be a positive whole number of hours, got {secs}s"
        )));
    }
    Ok(secs / SECS_PER_HOUR)
}

/// Maps a failed resolve/download response. Anonymous callers cannot tell an
/// unknown token from an expired one.
fn resolve_error(failure: ApiFailure, anonymous: bool) -> ClientError {
    let err = match failure.status {
        StatusCode::NOT_FOUND => ClientError::NotFound("share link".to_string()),
        StatusCode::FORBIDDEN if failure.message.to_lowercase().contains("expired") => {
            ClientError::Expired
        }
        StatusCode::FORBIDDEN => ClientError::Forbidden(failure.message),
        StatusCode::UNAUTHORIZED => ClientError::AuthRequired,
        _ => failure.into_error(),
    };
    collapse_for(err, anonymous)
}

fn collapse_for(err: ClientError, anonymous: bool) -> ClientError {
    match err {
        ClientError::NotFound(_) | ClientError::Expired if anonymous => {
            ClientError::LinkUnavailable
        }
        other => other,
    }
}

pub struct ShareManager {
    session: Arc<SessionManager>,
}

impl ShareManager {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Issues a link to `file_id` expiring `expires_in` from now.
    ///
    /// `recipient` restricts resolution to one (guest) user; `None` lets
    /// anyone holding the token resolve it. The server answers for files the
    /// caller does not own as if they did not exist, so both are reported as
    /// [`ClientError::NotOwner`].
    pub async fn create_link(
        &self,
        file_id: Uuid,
        permission: SharePermission,
        expires_in: Duration,
        recipient: Option<i64>,
    ) -> ClientResult<ShareToken> {
        let expires_in_hours = expiry_hours(expires_in)?;
        if !self.session.is_authenticated().await {
            return Err(ClientError::AuthRequired);
        }

        let req = CreateShareRequest {
            permissions: permission,
            expires_in_hours,
            guest_user_id: recipient,
        };
        let resp = self
            .session
            .request(
                Method::POST,
                &format!("/files/{file_id}/share/"),
                RequestBody::Json(serde_json::to_value(&req)?),
            )
            .await?;

        if !resp.status().is_success() {
            let failure = ApiFailure::read(resp).await;
            return Err(match failure.status {
                StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                    ClientError::NotOwner(file_id.to_string())
                }
                _ => failure.into_error(),
            });
        }

        let link: ShareToken = resp.json().await?;
        info!(
            "created {permission} link for file {file_id} (fp {}, expires {})",
            fingerprint(&link.token),
            link.expires_at
        );
        Ok(link)
    }

    /// Looks up a token and returns the shared file's metadata.
    pub async fn resolve(&self, token: &str) -> ClientResult<FileProjection> {
        self.resolve_at(token, Utc::now()).await
    }

    /// [`resolve`](Self::resolve) against an explicit clock. A projection
    /// whose `expires_at` lies before `now` is rejected even if the server
    /// returned it.
    pub async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> ClientResult<FileProjection> {
        validate_token(token)?;
        let anonymous = !self.session.is_authenticated().await;

        let resp = self
            .session
            .request(
                Method::GET,
                &format!("/files/shared-file/?token={token}"),
                RequestBody::Empty,
            )
            .await?;
        if !resp.status().is_success() {
            let failure = ApiFailure::read(resp).await;
            warn!(
                "share link {} rejected with {}",
                fingerprint(token),
                failure.status
            );
            return Err(resolve_error(failure, anonymous));
        }

        let projection: FileProjection = resp.json().await?;
        if projection.expires_at.is_some_and(|exp| now > exp) {
            warn!("share link {} past its expiry", fingerprint(token));
            return Err(collapse_for(ClientError::Expired, anonymous));
        }

        info!(
            "resolved share link {} -> file {} ({})",
            fingerprint(token),
            projection.file_id,
            projection.permission
        );
        Ok(projection)
    }

    /// Fetches ciphertext and key for a `download` link.
    pub async fn fetch_payload(&self, token: &str) -> ClientResult<(EncryptedPayload, ExportedKey)> {
        self.fetch_payload_at(token, Utc::now()).await
    }

    /// [`fetch_payload`](Self::fetch_payload) against an explicit clock.
    pub async fn fetch_payload_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> ClientResult<(EncryptedPayload, ExportedKey)> {
        let projection = self.resolve_at(token, now).await?;
        if !projection.permission.allows_download() {
            warn!(
                "refusing download through {} link {}",
                projection.permission,
                fingerprint(token)
            );
            return Err(ClientError::PermissionDenied(format!(
                "link grants {} access only",
                projection.permission
            )));
        }

        let anonymous = !self.session.is_authenticated().await;
        let resp = self
            .session
            .request(
                Method::GET,
                &format!("/files/shared-file/download/?token={token}"),
                RequestBody::Empty,
            )
            .await?;
        if !resp.status().is_success() {
            let failure = ApiFailure::read(resp).await;
            return Err(resolve_error(failure, anonymous));
        }

        read_encrypted_body(resp).await
    }

    /// Fetches and decrypts the file behind a `download` link.
    pub async fn fetch_decrypted(&self, token: &str) -> ClientResult<Vec<u8>> {
        let (payload, key) = self.fetch_payload(token).await?;
        Ok(decrypt_file(&payload, &key)?)
    }
}
