//! Error types for the shared gittorrent types.

use thiserror::Error;

/// Errors produced while parsing shared types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// A hex identifier had the wrong length or contained non-hex characters.
    #[error("invalid {kind}: {reason}")]
    InvalidId {
        /// Which identifier was being parsed.
        kind: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// A specialized Result type for shared type parsing.
pub type Result<T> = std::result::Result<T, TypesError>;
