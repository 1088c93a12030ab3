//! In-process seed store, shared by cloning the handle.

use crate::engine::file_name;
use crate::{transfer_id, CompletedFile, Result, TransferEngine};
use async_trait::async_trait;
use bytes::Bytes;
use gittorrent_types::TransferId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Default)]
struct Shared {
    files: Mutex<HashMap<TransferId, (String, Bytes)>>,
    downloads: Mutex<HashMap<TransferId, usize>>,
    seeded: Notify,
}

/// Seeded files held in memory.
#[derive(Clone, Default)]
pub struct MemorySwarm {
    shared: Arc<Shared>,
}

impl MemorySwarm {
    /// Creates an empty swarm.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds bytes directly under `name`.
    pub fn seed_bytes(&self, name: &str, content: impl Into<Bytes>) -> TransferId {
        let content = content.into();
        let id = transfer_id(name, &content);
        self.shared.files.lock().insert(id, (name.to_string(), content));
        self.shared.seeded.notify_waiters();
        id
    }

    /// Number of downloads started for `transfer`.
    #[must_use]
    pub fn download_count(&self, transfer: &TransferId) -> usize {
        self.shared.downloads.lock().get(transfer).copied().unwrap_or(0)
    }

    fn lookup(&self, transfer: &TransferId) -> Option<(String, Bytes)> {
        self.shared.files.lock().get(transfer).cloned()
    }
}

#[async_trait]
impl TransferEngine for MemorySwarm {
    async fn seed(&self, path: &Path) -> Result<TransferId> {
        let name = file_name(path)?;
        let content = tokio::fs::read(path).await?;
        let id = self.seed_bytes(&name, content);
        debug!(transfer = %id, name = %name, "Seeding");
        Ok(id)
    }

    async fn download(&self, transfer: &TransferId, into: &Path) -> Result<CompletedFile> {
        *self.shared.downloads.lock().entry(*transfer).or_default() += 1;
        let (name, content) = loop {
            let notified = self.shared.seeded.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(found) = self.lookup(transfer) {
                break found;
            }
            notified.await;
        };
        tokio::fs::create_dir_all(into).await?;
        let path = into.join(&name);
        tokio::fs::write(&path, &content).await?;
        debug!(transfer = %transfer, path = %path.display(), "Download complete");
        Ok(CompletedFile { name, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn download_after_seed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("abc.pack");
        tokio::fs::write(&source, b"PACK data").await.unwrap();

        let swarm = MemorySwarm::new();
        let id = swarm.seed(&source).await.unwrap();

        let out = dir.path().join("out");
        let file = swarm.download(&id, &out).await.unwrap();
        assert_eq!(file.name, "abc.pack");
        assert_eq!(tokio::fs::read(&file.path).await.unwrap(), b"PACK data");
        assert_eq!(swarm.download_count(&id), 1);
    }

    #[tokio::test]
    async fn download_waits_for_seed() {
        let dir = tempfile::tempdir().unwrap();
        let swarm = MemorySwarm::new();
        let id = transfer_id("late.pack", b"late");

        let downloader = {
            let swarm = swarm.clone();
            let out = dir.path().to_path_buf();
            tokio::spawn(async move { swarm.download(&id, &out).await })
        };
        tokio::task::yield_now().await;
        assert!(!downloader.is_finished());

        swarm.seed_bytes("late.pack", &b"late"[..]);
        let file = downloader.await.unwrap().unwrap();
        assert_eq!(file.name, "late.pack");
    }
}
