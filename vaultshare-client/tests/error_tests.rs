use vaultshare_client::ClientError;
use vaultshare_crypto::CryptoError;

#[test]
fn session_expired_display() {
    assert_eq!(
        ClientError::SessionExpired.to_string(),
        "session expired, re-authentication required"
    );
}

#[test]
fn link_unavailable_display() {
    assert_eq!(
        ClientError::LinkUnavailable.to_string(),
        "share link is invalid or has expired"
    );
}

#[test]
fn file_too_large_display() {
    let err = ClientError::FileTooLarge { size: 10, limit: 5 };
    assert_eq!(
        err.to_string(),
        "file too large: 10 bytes exceeds limit of 5 bytes"
    );
}

#[test]
fn api_error_display() {
    let err = ClientError::Api {
        status: 502,
        message: "Bad Gateway".into(),
    };
    assert_eq!(err.to_string(), "API request failed (502): Bad Gateway");
}

#[test]
fn not_owner_display() {
    let err = ClientError::NotOwner("abc".into());
    assert_eq!(err.to_string(), "not the owner of file abc");
}

#[test]
fn requires_login_only_for_session_errors() {
    assert!(ClientError::SessionExpired.requires_login());
    assert!(ClientError::AuthRequired.requires_login());
    assert!(!ClientError::Unauthorized.requires_login());
    assert!(!ClientError::Expired.requires_login());
}

#[test]
fn from_crypto_error() {
    let err: ClientError = CryptoError::Authentication.into();
    assert!(matches!(err, ClientError::Crypto(CryptoError::Authentication)));
    assert!(err.to_string().starts_with("crypto error:"));
}

#[test]
fn from_serde_json_error() {
    let json_err = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
    let err: ClientError = json_err.into();
    assert!(err.to_string().contains("serialization error"));
}
