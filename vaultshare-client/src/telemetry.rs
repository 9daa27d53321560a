//! Logging setup and log-safe identifiers.

use sha2::{Digest, Sha256};

/// Installs a stderr `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`). Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Short SHA-256 fingerprint of a secret, for correlating log lines
/// without writing the secret itself.
pub fn fingerprint(secret: &str) -> String {
    hex::encode(&Sha256::digest(secret.as_bytes())[..6])
}
