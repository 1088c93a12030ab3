//! Key and signature errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from publisher keys, record signatures and the key file.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A record signature did not verify against its key.
    #[error("record signature does not verify")]
    InvalidSignature,

    /// A public key is not a valid ed25519 point.
    #[error("malformed public key: {0}")]
    InvalidPublicKey(String),

    /// Secret key bytes are not 32 bytes long.
    #[error("malformed secret key")]
    InvalidSecretKey,

    /// The key file exists but cannot be used.
    #[error("key file {}: {reason}", path.display())]
    KeyFile {
        /// Path of the key file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Reading or writing the key file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for key operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
