//! The git executable handle.

use crate::{GitError, Result};
use std::process::ExitStatus;

/// Which git to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Git {
    program: String,
}

impl Git {
    /// Uses `program` as the git executable.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable name or path.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    pub(crate) fn spawn_error(&self, source: std::io::Error) -> GitError {
        GitError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    pub(crate) fn check(command: &str, status: ExitStatus) -> Result<()> {
        if status.success() {
            Ok(())
        } else {
            Err(GitError::Subprocess {
                command: command.to_string(),
                code: status.code(),
            })
        }
    }
}

impl Default for Git {
    fn default() -> Self {
        Self::new("git")
    }
}
