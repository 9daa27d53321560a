//! Client-side file encryption for VaultShare.
//!
//! Every file is sealed with its own random AES-256-GCM key before it leaves
//! the client. The server stores ciphertext plus the exported key and never
//! sees plaintext.
//!
//! # Architecture
//!
//! 1. **File key**: 32 random bytes from the OS CSPRNG, minted per upload
//!    and never reused across files. Compromise of one key exposes one file.
//!
//! 2. **Payload**: a 12-byte random nonce followed by the AES-GCM
//!    ciphertext and its 16-byte tag. The engine keeps no state between
//!    calls, so encryptions may run concurrently.
//!
//! 3. **Transport**: the key is exported as standard base64 and travels
//!    next to the ciphertext. Its secrecy in flight rests on the channel.
//!
//! Lost keys are not recoverable; there is no escrow.

mod cipher;
mod error;
mod key;

pub use cipher::{
    EncryptedPayload, NONCE_SIZE, TAG_SIZE, decrypt, decrypt_file, encrypt, encrypt_file,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{ExportedKey, KEY_SIZE, SymmetricKey, export_key, generate_key, import_key};
