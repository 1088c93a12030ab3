//! DHT error types.

use gittorrent_types::RecordKey;
use thiserror::Error;

/// Errors that can occur while talking to the DHT.
#[derive(Debug, Error)]
pub enum DhtError {
    /// The encoded directory does not fit in a DHT value.
    #[error("directory too large: {size} bytes exceeds the {max} byte limit")]
    DirectoryTooLarge {
        /// Encoded size in bytes.
        size: usize,
        /// The ceiling.
        max: usize,
    },

    /// No record is stored under the key.
    #[error("no record found for {0}")]
    NotFound(RecordKey),

    /// A record or key could not be decoded.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// A record's signature does not verify against its key.
    #[error("record signature is invalid")]
    InvalidSignature,

    /// A peer lookup could not be started.
    #[error("lookup failed: {0}")]
    LookupFailed(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for DHT operations.
pub type Result<T> = std::result::Result<T, DhtError>;
