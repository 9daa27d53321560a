//! Shared helpers for client tests against a wiremock server.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::sync::Arc;
use vaultshare_client::{ClientConfig, Credentials, SessionManager, TokenStore};
use wiremock::MockServer;

pub const FILE_ID: &str = "6f1c2d3e-4b5a-4c6d-8e7f-9a0b1c2d3e4f";
pub const TOKEN: &str = "Zx8kP2mQ_vR7tY4wA1bC-9dE6fG3hJ0kL5nM2pQ8sT0";

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::for_base_url(format!("{}/api", server.uri()))
}

/// Session with no credentials.
pub fn anonymous_session(server: &MockServer) -> Arc<SessionManager> {
    let store = Arc::new(TokenStore::in_memory());
    Arc::new(SessionManager::new(config_for(server), store).unwrap())
}

/// Session already holding the given access/refresh pair.
pub async fn session_with_tokens(
    server: &MockServer,
    access: &str,
    refresh: &str,
) -> Arc<SessionManager> {
    let store = Arc::new(TokenStore::in_memory());
    store
        .update(
            Credentials {
                access_token: access.into(),
                refresh_token: refresh.into(),
            },
            None,
        )
        .await
        .unwrap();
    Arc::new(SessionManager::new(config_for(server), store).unwrap())
}

pub fn user_json() -> serde_json::Value {
    serde_json::json!({
        "id": 7,
        "email": "owner@example.com",
        "role": "user",
        "is_mfa_enabled": false
    })
}

pub fn login_response() -> serde_json::Value {
    serde_json::json!({
        "access": "at-login",
        "refresh": "rt-login",
        "user": user_json()
    })
}

pub fn file_record_json() -> serde_json::Value {
    serde_json::json!({
        "id": FILE_ID,
        "filename": "report.pdf",
        "size": 2048,
        "mime_type": "application/pdf",
        "uploaded_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z"
    })
}

pub fn projection_json(permission: &str, expires_at: Option<DateTime<Utc>>) -> serde_json::Value {
    let mut value = serde_json::json!({
        "filename": "report.pdf",
        "fileId": FILE_ID,
        "mime_type": "application/pdf",
        "size": 2048,
        "shared_by": "owner@example.com",
        "uploaded_at": "2025-03-01T10:00:00Z",
        "permissions": permission
    });
    if let Some(exp) = expires_at {
        value["expires_at"] = serde_json::Value::String(exp.to_rfc3339());
    }
    value
}
