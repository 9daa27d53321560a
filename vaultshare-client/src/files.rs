//! Encrypted file upload, listing, download and deletion.

use crate::error::{ClientError, ClientResult};
use crate::session::{MultipartField, RequestBody, SessionManager, ensure_success};
use crate::types::FileRecord;
use reqwest::{Method, Response};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use vaultshare_crypto::{
    EncryptedPayload, ExportedKey, NONCE_SIZE, TAG_SIZE, decrypt_file, encrypt_file,
};

/// Response header carrying the base64 file key on downloads.
pub const ENCRYPTION_KEY_HEADER: &str = "x-encryption-key";

/// Splits a download response into ciphertext and transported key.
pub(crate) async fn read_encrypted_body(
    resp: Response,
) -> ClientResult<(EncryptedPayload, ExportedKey)> {
    let key = resp
        .headers()
        .get(ENCRYPTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(ExportedKey::new)
        .ok_or(ClientError::MissingKeyHeader)?;

    let bytes = resp.bytes().await?;
    Ok((EncryptedPayload::from_bytes(bytes.to_vec()), key))
}

/// File operations for the logged-in owner.
pub struct FileService {
    session: Arc<SessionManager>,
}

impl FileService {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Encrypts `plaintext` under a fresh key and uploads ciphertext and key.
    ///
    /// The server limits the stored ciphertext, which is the plaintext plus
    /// nonce and tag, so the size check is made against that length before
    /// any encryption work.
    pub async fn upload(
        &self,
        filename: &str,
        mime_type: &str,
        plaintext: &[u8],
    ) -> ClientResult<FileRecord> {
        let config = self.session.config();
        if !config.is_mime_allowed(mime_type) {
            return Err(ClientError::UnsupportedFile(mime_type.to_string()));
        }
        let size = plaintext.len() as u64;
        let encrypted_size = size + (NONCE_SIZE + TAG_SIZE) as u64;
        if encrypted_size > config.max_upload_bytes {
            return Err(ClientError::FileTooLarge {
                size: encrypted_size,
                limit: config.max_upload_bytes,
            });
        }

        let (payload, key) = encrypt_file(plaintext)?;
        debug!("encrypted {filename}: {size} -> {} bytes", payload.len());

        let body = RequestBody::Multipart(vec![
            MultipartField::file("file", filename, mime_type, payload.into_bytes()),
            MultipartField::text("encryption_key", key.as_str()),
        ]);
        let record: FileRecord = self
            .session
            .request_json(Method::POST, "/files/", body)
            .await?;

        info!("uploaded file {} ({filename})", record.id);
        Ok(record)
    }

    pub async fn list(&self) -> ClientResult<Vec<FileRecord>> {
        self.session
            .request_json(Method::GET, "/files/", RequestBody::Empty)
            .await
    }

    /// Fetches the stored ciphertext and its key without decrypting.
    pub async fn download(&self, id: Uuid) -> ClientResult<(EncryptedPayload, ExportedKey)> {
        let resp = self
            .session
            .request(
                Method::GET,
                &format!("/files/{id}/download/"),
                RequestBody::Empty,
            )
            .await?;
        read_encrypted_body(ensure_success(resp).await?).await
    }

    pub async fn download_decrypted(&self, id: Uuid) -> ClientResult<Vec<u8>> {
        let (payload, key) = self.download(id).await?;
        Ok(decrypt_file(&payload, &key)?)
    }

    /// Deletes the record and its ciphertext on the server.
    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        let resp = self
            .session
            .request(Method::DELETE, &format!("/files/{id}/"), RequestBody::Empty)
            .await?;
        ensure_success(resp).await?;
        info!("deleted file {id}");
        Ok(())
    }
}
