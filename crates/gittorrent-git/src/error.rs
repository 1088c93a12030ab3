//! git error types.

use thiserror::Error;

/// Errors from running or talking to git.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git executable could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// The executable.
        program: String,
        /// Why it did not start.
        source: std::io::Error,
    },

    /// A git subprocess exited unsuccessfully.
    #[error("{command} exited with {}", code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    Subprocess {
        /// The git subcommand.
        command: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
    },

    /// Invalid pkt-line format.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// The conversation with git went off script.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// git printed something we cannot parse.
    #[error("unexpected git output: {0}")]
    InvalidOutput(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;
