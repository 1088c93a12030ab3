//! `git ls-remote`.

use crate::{Git, GitError, Result};
use gittorrent_types::ObjectId;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// One line of `ls-remote` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// Object the ref points at.
    pub id: ObjectId,
    /// Full ref name, e.g. `refs/heads/master` or `HEAD`.
    pub name: String,
}

/// Parses `<object-id>\t<ref-name>` lines.
///
/// # Errors
///
/// Returns [`GitError::InvalidOutput`] on a line without a tab or with a bad id.
pub fn parse_ls_remote(output: &str) -> Result<Vec<RemoteRef>> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (id, name) = line
                .split_once('\t')
                .ok_or_else(|| GitError::InvalidOutput(format!("ls-remote line without tab: {line}")))?;
            let id = id
                .parse()
                .map_err(|e| GitError::InvalidOutput(format!("ls-remote id {id}: {e}")))?;
            Ok(RemoteRef {
                id,
                name: name.to_string(),
            })
        })
        .collect()
}

impl Git {
    /// Lists the refs of a repository path or URL.
    ///
    /// # Errors
    ///
    /// Returns an error if git cannot be started, exits unsuccessfully, or
    /// prints something that is not a ref listing.
    pub async fn ls_remote(&self, target: &str) -> Result<Vec<RemoteRef>> {
        let output = Command::new(self.program())
            .arg("ls-remote")
            .arg(target)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        Git::check("git ls-remote", output.status)?;

        let refs = parse_ls_remote(&String::from_utf8_lossy(&output.stdout))?;
        debug!(target, refs = refs.len(), "Listed refs");
        Ok(refs)
    }
}
