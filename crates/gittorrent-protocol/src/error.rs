//! Protocol error types.

use gittorrent_types::ObjectId;
use thiserror::Error;

/// Errors that can occur on a peer wire.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message is malformed.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The frame exceeds size limits.
    #[error("frame too large: {size} bytes (max {max})")]
    TooLarge {
        /// The announced size.
        size: usize,
        /// The maximum allowed size.
        max: usize,
    },

    /// A message arrived in a state that does not accept it.
    #[error("unexpected {message} while {state}")]
    UnexpectedMessage {
        /// The handler state, for diagnostics.
        state: String,
        /// The message kind.
        message: &'static str,
    },

    /// The remote handshake named a different extension.
    #[error("extension mismatch: expected {expected}, peer offered {offered}")]
    ExtensionMismatch {
        /// Our extension name.
        expected: String,
        /// The name the peer sent.
        offered: String,
    },

    /// `run` was called without a registered handler.
    #[error("no extension handler registered")]
    NoHandler,

    /// A second handler was registered on one wire.
    #[error("extension {0} already registered")]
    AlreadyRegistered(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the provider's pack pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The object id is not in the announced index.
    #[error("object {0} is not announced")]
    UnknownObject(ObjectId),

    /// A subprocess exited unsuccessfully.
    #[error("{program} exited with {}", code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    Subprocess {
        /// The program that failed.
        program: String,
        /// Its exit code, if it exited normally.
        code: Option<i32>,
    },

    /// Pack generation failed other than by exit status.
    #[error("pack generation failed: {0}")]
    Pack(String),

    /// The transfer engine refused to seed.
    #[error("seeding failed: {0}")]
    Transfer(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
