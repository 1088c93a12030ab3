//! Pack ingestion through `git index-pack`.

use crate::{Git, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// How an ingestion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl IngestOutcome {
    /// True when the pack was accepted.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Feeds downloaded packs into the local object store.
#[async_trait]
pub trait PackIngest: Send + Sync {
    /// Ingests the pack at `pack`. A rejected pack is an `Ok` outcome with a
    /// non-zero code; `Err` means the ingester could not run at all.
    async fn ingest(&self, pack: &Path) -> Result<IngestOutcome>;
}

/// `git index-pack --stdin -v --fix-thin`.
///
/// stdout is discarded because the remote helper's stdout belongs to git;
/// stderr passes through so the user sees progress.
#[derive(Debug, Clone, Default)]
pub struct IndexPack {
    git: Git,
    dir: Option<PathBuf>,
}

impl IndexPack {
    /// Ingests into the repository of the current directory (or `GIT_DIR`).
    #[must_use]
    pub fn new(git: Git) -> Self {
        Self { git, dir: None }
    }

    /// Runs index-pack from `dir` instead.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl PackIngest for IndexPack {
    async fn ingest(&self, pack: &Path) -> Result<IngestOutcome> {
        let mut command = Command::new(self.git.program());
        command
            .args(["index-pack", "--stdin", "-v", "--fix-thin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }
        let mut child = command.spawn().map_err(|e| self.git.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut file = tokio::fs::File::open(pack).await?;
            // index-pack may exit early on a bad pack; its exit code reports that.
            if let Err(e) = tokio::io::copy(&mut file, &mut stdin).await {
                debug!(pack = %pack.display(), error = %e, "index-pack stopped reading");
            }
        }

        let status = child.wait().await?;
        debug!(pack = %pack.display(), code = ?status.code(), "index-pack exited");
        Ok(IngestOutcome { code: status.code() })
    }
}
