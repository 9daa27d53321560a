//! Wire types shared by the session, file and share services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Metadata of an uploaded file. The ciphertext itself is never listed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner_id: Option<i64>,
}

/// Access level a share link grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    /// Metadata only. Never authorizes fetching ciphertext or key.
    View,
    Download,
}

impl SharePermission {
    pub fn allows_download(self) -> bool {
        matches!(self, Self::Download)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Download => "download",
        }
    }
}

impl fmt::Display for SharePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A share link as returned when it is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShareToken {
    pub token: String,
    #[serde(rename = "permissions")]
    pub permission: SharePermission,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Only this user may resolve the link. `None` means anyone holding it.
    #[serde(default, rename = "guest_user_id")]
    pub recipient_id: Option<i64>,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_count: u64,
}

impl ShareToken {
    /// Expired once `now` is strictly past `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Public page URL for this link, e.g. `https://app.example/viewfile/<token>`.
    pub fn share_url(&self, frontend_base: &str) -> String {
        format!("{}/viewfile/{}", frontend_base.trim_end_matches('/'), self.token)
    }
}

/// Read-only view of a shared file, as seen by a link holder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileProjection {
    pub filename: String,
    #[serde(rename = "fileId")]
    pub file_id: Uuid,
    pub mime_type: String,
    pub size: u64,
    pub shared_by: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(rename = "permissions")]
    pub permission: SharePermission,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Access/refresh bearer pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

/// The authenticated account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub is_mfa_enabled: bool,
}

/// A guest account that recipient-bound links can target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuestUser {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// An established login.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user: User,
    pub credentials: Credentials,
}

/// Result of a login attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum LoginOutcome {
    Authenticated(Session),
    /// Password accepted; resend with a TOTP code.
    MfaRequired,
}

/// Registration form.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password2: String,
    pub role: UserRole,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// TOTP enrollment returned by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MfaSetup {
    pub secret: String,
    pub uri: String,
}

/// Request to create a share link.
#[derive(Clone, Debug, Serialize)]
pub struct CreateShareRequest {
    pub permissions: SharePermission,
    /// Hours until expiry.
    #[serde(rename = "expiresIn")]
    pub expires_in_hours: u64,
    #[serde(rename = "guestUserId")]
    pub guest_user_id: Option<i64>,
}

/// Observable session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    Refreshing,
    /// Refresh failed; credentials were dropped and a new login is needed.
    Expired,
}
