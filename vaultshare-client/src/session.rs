//! Authenticated request pipeline with single-flight token refresh.
//!
//! Every API call goes through [`SessionManager::request`]:
//!
//! 1. The current access token (if any) is attached and the request is sent.
//! 2. On `401`, the manager refreshes the access token. Only one refresh runs
//!    at a time; callers that hit `401` while a refresh is in flight wait for
//!    it and reuse its result instead of spending the refresh token again.
//! 3. The request is rebuilt and sent exactly once more. A second `401` is a
//!    hard failure.
//!
//! A failed refresh clears the credentials before surfacing
//! [`ClientError::SessionExpired`].

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::telemetry::fingerprint;
use crate::token_store::TokenStore;
use crate::types::{
    Credentials, GuestUser, LoginOutcome, MfaSetup, RegisterRequest, Session, SessionState, User,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "/users/login/";
const REGISTER_PATH: &str = "/users/register/";
const REFRESH_PATH: &str = "/users/token/refresh/";
const PROFILE_PATH: &str = "/users/profile/";
const GUEST_USERS_PATH: &str = "/users/guest-users/";
const ENABLE_MFA_PATH: &str = "/users/enable-mfa/";
const VERIFY_MFA_PATH: &str = "/users/verify-mfa/";

/// One field of a multipart form.
#[derive(Clone, Debug)]
pub enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

impl MultipartField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self::File {
            name: name.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Owned request body, rebuilt for every attempt.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<MultipartField>),
}

impl RequestBody {
    fn build_form(fields: &[MultipartField]) -> ClientResult<Form> {
        let mut form = Form::new();
        for field in fields {
            form = match field {
                MultipartField::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartField::File {
                    name,
                    filename,
                    mime_type,
                    bytes,
                } => {
                    let part = Part::bytes(bytes.clone())
                        .file_name(filename.clone())
                        .mime_str(mime_type)?;
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

/// A non-2xx response, read once so callers can map it.
#[derive(Debug)]
pub(crate) struct ApiFailure {
    pub status: StatusCode,
    pub body: serde_json::Value,
    pub message: String,
}

impl ApiFailure {
    pub async fn read(resp: Response) -> Self {
        let status = resp.status();
        let body = match resp.bytes().await {
            Ok(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            }),
            _ => serde_json::Value::Null,
        };
        let message = ["message", "error", "detail"]
            .iter()
            .find_map(|k| body.get(*k).and_then(|v| v.as_str()))
            .map(str::to_string)
            .or_else(|| body.as_str().map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        Self {
            status,
            body,
            message,
        }
    }

    /// Default status mapping shared by all endpoints.
    pub fn into_error(self) -> ClientError {
        match self.status {
            StatusCode::BAD_REQUEST => ClientError::Validation(self.body),
            StatusCode::UNAUTHORIZED => ClientError::AuthRequired,
            StatusCode::FORBIDDEN => ClientError::Forbidden(self.message),
            StatusCode::NOT_FOUND => ClientError::NotFound(self.message),
            status => ClientError::Api {
                status: status.as_u16(),
                message: self.message,
            },
        }
    }
}

/// Passes 2xx responses through and maps everything else with
/// [`ApiFailure::into_error`].
pub(crate) async fn ensure_success(resp: Response) -> ClientResult<Response> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(ApiFailure::read(resp).await.into_error())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    mfa_required: bool,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the server rotates refresh tokens.
    #[serde(default)]
    refresh: Option<String>,
}

/// Marks a refresh as in flight; lowered on drop so a cancelled refresh
/// cannot leave the session stuck in `Refreshing`.
struct RefreshingFlag<'a>(&'a AtomicBool);

impl<'a> RefreshingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RefreshingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the HTTP client and drives the credential lifecycle for one login.
pub struct SessionManager {
    client: Client,
    config: ClientConfig,
    store: Arc<TokenStore>,
    /// Serializes refreshes so a refresh token is never spent twice.
    refresh_gate: Mutex<()>,
    refreshing: AtomicBool,
    expired: AtomicBool,
}

impl SessionManager {
    pub fn new(config: ClientConfig, store: Arc<TokenStore>) -> ClientResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            store,
            refresh_gate: Mutex::new(()),
            refreshing: AtomicBool::new(false),
            expired: AtomicBool::new(false),
        })
    }

    /// Builds a manager whose token store lives where the config says,
    /// restoring any saved session.
    pub async fn open(config: ClientConfig) -> ClientResult<Self> {
        let store = match &config.token_store_path {
            Some(path) => TokenStore::init(path.clone()).await?,
            None => TokenStore::in_memory(),
        };
        Self::new(config, Arc::new(store))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub async fn state(&self) -> SessionState {
        if self.refreshing.load(Ordering::SeqCst) {
            SessionState::Refreshing
        } else if self.store.is_authenticated().await {
            SessionState::Authenticated
        } else if self.expired.load(Ordering::SeqCst) {
            SessionState::Expired
        } else {
            SessionState::Anonymous
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.store.is_authenticated().await
    }

    pub async fn current_user(&self) -> Option<User> {
        self.store.user().await
    }

    // ── Request pipeline ──

    /// Sends a request with the current access token and the refresh stage.
    ///
    /// Requests made without credentials go out anonymously and their `401`
    /// is returned as-is. Non-authorization failures are never reinterpreted.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> ClientResult<Response> {
        let snapshot = self.store.snapshot().await;
        let resp = self
            .send_once(&method, path, &body, snapshot.access_token())
            .await?;

        if resp.status() != StatusCode::UNAUTHORIZED || snapshot.credentials.is_none() {
            return Ok(resp);
        }

        debug!("401 on {method} {path}, refreshing token");
        let token = self.refresh_after(snapshot.generation).await?;

        let retried = self.send_once(&method, path, &body, Some(&token)).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!("401 on {method} {path} after refresh, giving up");
            return Err(ClientError::Unauthorized);
        }
        Ok(retried)
    }

    /// Sends a request and decodes a JSON success body.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> ClientResult<T> {
        let resp = ensure_success(self.request(method, path, body).await?).await?;
        Ok(resp.json().await?)
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: &RequestBody,
        token: Option<&str>,
    ) -> ClientResult<Response> {
        let mut builder = self.client.request(method.clone(), self.config.url(path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(fields) => builder.multipart(RequestBody::build_form(fields)?),
        };
        Ok(builder.send().await?)
    }

    // ── Refresh ──

    /// Obtains a fresh access token for a request that was sent at
    /// `seen_generation` and got `401`.
    async fn refresh_after(&self, seen_generation: u64) -> ClientResult<String> {
        let _guard = self.refresh_gate.lock().await;

        // Someone else refreshed, logged in or logged out while we waited.
        let current = self.store.snapshot().await;
        if current.generation != seen_generation {
            return current
                .credentials
                .map(|c| c.access_token)
                .ok_or(ClientError::SessionExpired);
        }

        let refresh_token = match current.credentials {
            Some(c) if !c.refresh_token.is_empty() => c.refresh_token,
            _ => {
                warn!("no refresh token available, expiring session");
                self.expire().await;
                return Err(ClientError::SessionExpired);
            }
        };

        let outcome = {
            let _flag = RefreshingFlag::raise(&self.refreshing);
            self.call_refresh(&refresh_token).await
        };

        let refreshed = match outcome {
            Ok(r) => r,
            Err(e) => {
                warn!("token refresh failed: {e}");
                self.expire().await;
                return Err(ClientError::SessionExpired);
            }
        };

        match self
            .store
            .update_access(refreshed.access.clone(), refreshed.refresh)
            .await
        {
            Ok(true) => {}
            Ok(false) => return Err(ClientError::SessionExpired),
            Err(e) => warn!("refreshed session could not be persisted: {e}"),
        }

        info!(
            "refreshed access token (fp {})",
            fingerprint(&refreshed.access)
        );
        Ok(refreshed.access)
    }

    async fn call_refresh(&self, refresh_token: &str) -> ClientResult<RefreshResponse> {
        let resp = self
            .client
            .post(self.config.url(REFRESH_PATH))
            .json(&serde_json::json!({ "refresh": refresh_token }))
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json().await?)
    }

    async fn expire(&self) {
        if let Err(e) = self.store.clear().await {
            warn!("failed to clear stored session: {e}");
        }
        self.expired.store(true, Ordering::SeqCst);
    }

    // ── Auth ──

    /// Logs in with email and password, plus a TOTP code if the account
    /// has MFA enabled.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        mfa_token: Option<&str>,
    ) -> ClientResult<LoginOutcome> {
        let mut body = serde_json::json!({ "email": email, "password": password });
        if let Some(code) = mfa_token {
            body["mfa_token"] = serde_json::Value::String(code.to_string());
        }

        let resp = self
            .client
            .post(self.config.url(LOGIN_PATH))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let failure = ApiFailure::read(resp).await;
            return Err(match failure.status {
                StatusCode::UNAUTHORIZED => ClientError::InvalidCredentials(failure.message),
                _ => failure.into_error(),
            });
        }

        let status = resp.status();
        let tokens: TokenResponse = resp.json().await?;
        if tokens.mfa_required {
            debug!("login for {email} requires MFA code");
            return Ok(LoginOutcome::MfaRequired);
        }

        let session = self.establish(status, tokens).await?;
        info!("logged in as user {}", session.user.id);
        Ok(LoginOutcome::Authenticated(session))
    }

    /// Creates an account and logs into it.
    pub async fn register(&self, req: &RegisterRequest) -> ClientResult<Session> {
        let resp = self
            .client
            .post(self.config.url(REGISTER_PATH))
            .json(req)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;

        let status = resp.status();
        let tokens: TokenResponse = resp.json().await?;
        let session = self.establish(status, tokens).await?;
        info!("registered user {}", session.user.id);
        Ok(session)
    }

    async fn establish(&self, status: StatusCode, tokens: TokenResponse) -> ClientResult<Session> {
        let (Some(access), Some(refresh), Some(user)) = (tokens.access, tokens.refresh, tokens.user)
        else {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: "invalid server response: missing tokens or user".to_string(),
            });
        };

        let credentials = Credentials {
            access_token: access,
            refresh_token: refresh,
        };
        self.store
            .update(credentials.clone(), Some(user.clone()))
            .await?;
        self.expired.store(false, Ordering::SeqCst);

        Ok(Session { user, credentials })
    }

    /// Drops the session. Safe to call repeatedly.
    ///
    /// The in-memory session is gone even when this returns an error; the
    /// error means the persisted copy could not be neutralized and would be
    /// restored by the next [`open`](Self::open).
    pub async fn logout(&self) -> ClientResult<()> {
        let cleared = self.store.clear().await;
        self.expired.store(false, Ordering::SeqCst);
        match &cleared {
            Ok(()) => info!("logged out"),
            Err(e) => warn!("logged out, but stored session remains: {e}"),
        }
        cleared
    }

    // ── Account ──

    pub async fn profile(&self) -> ClientResult<User> {
        self.request_json(Method::GET, PROFILE_PATH, RequestBody::Empty)
            .await
    }

    /// Guest accounts that recipient-bound links can be issued to.
    pub async fn guest_users(&self) -> ClientResult<Vec<GuestUser>> {
        self.request_json(Method::GET, GUEST_USERS_PATH, RequestBody::Empty)
            .await
    }

    pub async fn enable_mfa(&self) -> ClientResult<MfaSetup> {
        self.request_json(Method::POST, ENABLE_MFA_PATH, RequestBody::Empty)
            .await
    }

    pub async fn verify_mfa(&self, code: &str) -> ClientResult<()> {
        let resp = self
            .request(
                Method::POST,
                VERIFY_MFA_PATH,
                RequestBody::Json(serde_json::json!({ "token": code })),
            )
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }
}
