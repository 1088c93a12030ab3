//! Node error types.

use thiserror::Error;

/// Errors raised while starting or running a node.
///
/// `Config` and `Identity` are fatal at startup.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The default configuration file could not be written.
    #[error("could not write default configuration: {0}")]
    ConfigWrite(#[from] serde_yaml::Error),

    /// No configuration directory could be determined.
    #[error("no configuration directory; pass --config-dir")]
    NoConfigDir,

    /// The signing key could not be loaded or created.
    #[error("key error: {0}")]
    Identity(#[from] gittorrent_identity::IdentityError),

    /// DHT failure.
    #[error("dht error: {0}")]
    Dht(#[from] gittorrent_dht::DhtError),

    /// git failure.
    #[error("git error: {0}")]
    Git(#[from] gittorrent_git::GitError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
