//! Remote helper error types.

use thiserror::Error;

/// Errors that end a helper invocation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote URL cannot be used.
    #[error("invalid remote URL {url:?}: {reason}")]
    InvalidUrl {
        /// The URL as given.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Listing a plain remote failed.
    #[error("listing failed: {0}")]
    Listing(#[from] gittorrent_git::GitError),

    /// DHT failure.
    #[error("dht error: {0}")]
    Dht(#[from] gittorrent_dht::DhtError),

    /// I/O error on the helper's stdin or stdout.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for remote helper operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
