//! Swarm error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while seeding or downloading.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// The path to seed has no file name.
    #[error("cannot seed {}: not a file path", .0.display())]
    NotAFile(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for swarm operations.
pub type Result<T> = std::result::Result<T, SwarmError>;
