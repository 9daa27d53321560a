mod support;

use pretty_assertions::assert_eq;
use support::{FILE_ID, anonymous_session, file_record_json, session_with_tokens};
use uuid::Uuid;
use vaultshare_client::ClientError;
use vaultshare_client::FileService;
use vaultshare_client::files::ENCRYPTION_KEY_HEADER;
use vaultshare_crypto::{CryptoError, NONCE_SIZE, TAG_SIZE, encrypt_file};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn file_id() -> Uuid {
    FILE_ID.parse().unwrap()
}

/// Byte-level body match; multipart bodies carry binary ciphertext.
fn body_has(needle: &'static str) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |req: &Request| {
        req.body
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }
}

// --- Upload ---

#[tokio::test]
async fn upload_sends_ciphertext_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .and(header("authorization", "Bearer at"))
        .and(body_has("name=\"encryption_key\""))
        .and(body_has("filename=\"report.pdf\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_record_json()))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with_tokens(&server, "at", "rt").await;
    let files = FileService::new(session);
    let record = files
        .upload("report.pdf", "application/pdf", b"%PDF-1.7 plaintext body")
        .await
        .unwrap();

    assert_eq!(record.id, file_id());
    assert_eq!(record.filename, "report.pdf");
    assert_eq!(record.size, 2048);
}

#[tokio::test]
async fn upload_never_sends_plaintext() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .and(body_has("TOP-SECRET-MARKER"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_record_json()))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with_tokens(&server, "at", "rt").await;
    let files = FileService::new(session);
    files
        .upload("notes.txt", "text/plain", b"TOP-SECRET-MARKER")
        .await
        .unwrap();
}

#[tokio::test]
async fn upload_rejects_unsupported_type_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_record_json()))
        .expect(0)
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    let err = files
        .upload("setup.exe", "application/x-msdownload", b"MZ")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::UnsupportedFile(ref m) if m == "application/x-msdownload"));
}

#[tokio::test]
async fn upload_rejects_file_whose_ciphertext_exceeds_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    let limit = 5 * 1024 * 1024;
    let overhead = NONCE_SIZE + TAG_SIZE;
    let big = vec![0u8; limit - overhead + 1];
    let err = files.upload("big.txt", "text/plain", &big).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::FileTooLarge {
            size: 5_242_881,
            limit: 5_242_880
        }
    ));
}

#[tokio::test]
async fn upload_accepts_file_whose_ciphertext_fills_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_record_json()))
        .expect(1)
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    let exact = vec![0u8; 5 * 1024 * 1024 - (NONCE_SIZE + TAG_SIZE)];
    files.upload("full.txt", "text/plain", &exact).await.unwrap();
}

#[tokio::test]
async fn upload_surfaces_server_validation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "file": ["File size cannot exceed 5MB"]
        })))
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    let err = files
        .upload("a.txt", "text/plain", b"hello")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn upload_requires_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let files = FileService::new(anonymous_session(&server));
    let err = files.upload("a.txt", "text/plain", b"hi").await.unwrap_err();
    assert!(matches!(err, ClientError::AuthRequired));
}

// --- List ---

#[tokio::test]
async fn list_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([file_record_json()])),
        )
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    let listed = files.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].mime_type, "application/pdf");
    assert_eq!(listed[0].owner_id, None);
}

// --- Download ---

#[tokio::test]
async fn download_decrypts_with_header_key() {
    let server = MockServer::start().await;
    let (payload, key) = encrypt_file(b"decrypted contents").unwrap();
    Mock::given(method("GET"))
        .and(path(format!("/api/files/{FILE_ID}/download/")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(ENCRYPTION_KEY_HEADER, key.as_str())
                .set_body_bytes(payload.as_bytes().to_vec()),
        )
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    let plaintext = files.download_decrypted(file_id()).await.unwrap();
    assert_eq!(plaintext, b"decrypted contents");
}

#[tokio::test]
async fn download_without_key_header_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/files/{FILE_ID}/download/")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 64]))
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    let err = files.download(file_id()).await.unwrap_err();
    assert!(matches!(err, ClientError::MissingKeyHeader));
}

#[tokio::test]
async fn download_with_mismatched_key_fails_closed() {
    let server = MockServer::start().await;
    let (payload, _) = encrypt_file(b"original").unwrap();
    let (_, other_key) = encrypt_file(b"other").unwrap();
    Mock::given(method("GET"))
        .and(path(format!("/api/files/{FILE_ID}/download/")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(ENCRYPTION_KEY_HEADER, other_key.as_str())
                .set_body_bytes(payload.into_bytes()),
        )
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    let err = files.download_decrypted(file_id()).await.unwrap_err();
    assert!(matches!(err, ClientError::Crypto(CryptoError::Authentication)));
}

#[tokio::test]
async fn download_missing_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/files/{FILE_ID}/download/")))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({ "detail": "Not found." })),
        )
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    let err = files.download(file_id()).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(ref m) if m == "Not found."));
}

// --- Delete ---

#[tokio::test]
async fn delete_file() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/files/{FILE_ID}/")))
        .and(header("authorization", "Bearer at"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let files = FileService::new(session_with_tokens(&server, "at", "rt").await);
    files.delete(file_id()).await.unwrap();
}
