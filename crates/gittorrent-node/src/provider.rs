//! The pack pipeline behind provider connections.

use crate::IndexHandle;
use async_trait::async_trait;
use gittorrent_git::{Git, GitError, PackRequest};
use gittorrent_protocol::{PackPipeline, PipelineError};
use gittorrent_swarm::TransferEngine;
use gittorrent_types::{ObjectId, TransferId};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

/// Generates packs with `git upload-pack` and seeds them.
///
/// Only objects in the current [`crate::AnnouncedIndex`] are served.
#[derive(Clone)]
pub struct GitPackPipeline {
    index: IndexHandle,
    git: Git,
    work_dir: PathBuf,
    swarm: Arc<dyn TransferEngine>,
}

impl GitPackPipeline {
    /// Creates a pipeline writing packs under `work_dir`.
    #[must_use]
    pub fn new(index: IndexHandle, git: Git, work_dir: impl Into<PathBuf>, swarm: Arc<dyn TransferEngine>) -> Self {
        Self {
            index,
            git,
            work_dir: work_dir.into(),
            swarm,
        }
    }

    /// Where the pack for `id` is written.
    #[must_use]
    pub fn pack_path(&self, id: &ObjectId) -> PathBuf {
        self.work_dir.join(format!("{id}.pack"))
    }

    /// A fresh scratch name for a pack being written, unique within `work_dir`.
    fn temp_path(&self, id: &ObjectId) -> PathBuf {
        let n = NEXT_TEMP.fetch_add(1, Ordering::Relaxed);
        self.work_dir.join(format!(".{id}.{}.{n}.pack.tmp", std::process::id()))
    }
}

fn pipeline_error(e: GitError) -> PipelineError {
    match e {
        GitError::Subprocess { command, code } => PipelineError::Subprocess { program: command, code },
        GitError::Spawn { source, .. } | GitError::Io(source) => PipelineError::Io(source),
        other => PipelineError::Pack(other.to_string()),
    }
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial pack"),
    }
}

#[async_trait]
impl PackPipeline for GitPackPipeline {
    async fn generate(&self, id: &ObjectId) -> Result<PathBuf, PipelineError> {
        let index = self.index.current();
        let repository = index
            .repository_for(id)
            .ok_or(PipelineError::UnknownObject(*id))?
            .to_path_buf();
        let have = index.head_of(&repository).filter(|head| head != id);

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let output = self.pack_path(id);
        let scratch = self.temp_path(id);
        debug!(id = %id, repository = %repository.display(), have = ?have, "Generating pack");

        // Concurrent requests for one id each write their own scratch file;
        // the rename swaps in a complete pack.
        let generated = self
            .git
            .generate_pack(PackRequest {
                repository,
                want: *id,
                have,
                output: scratch.clone(),
            })
            .await;
        let size = match generated {
            Ok(size) => size,
            Err(e) => {
                discard(&scratch).await;
                return Err(pipeline_error(e));
            }
        };
        if let Err(e) = tokio::fs::rename(&scratch, &output).await {
            discard(&scratch).await;
            return Err(e.into());
        }

        info!(id = %id, size, "Pack written");
        Ok(output)
    }

    async fn seed(&self, path: &Path) -> Result<TransferId, PipelineError> {
        self.swarm
            .seed(path)
            .await
            .map_err(|e| PipelineError::Transfer(e.to_string()))
    }
}
