//! Seed store kept under a directory shared by processes on one host.
//!
//! A seeded file lives at `<root>/<transfer-id>/<name>`. Files are staged in
//! a sibling directory and renamed into place, so a reader never sees a
//! partial file.

use crate::engine::file_name;
use crate::{transfer_id, CompletedFile, Result, TransferEngine};
use async_trait::async_trait;
use gittorrent_types::TransferId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// How often a waiting download checks for its file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Filesystem seed store.
#[derive(Debug, Clone)]
pub struct LocalSwarm {
    root: PathBuf,
    poll: Duration,
}

impl LocalSwarm {
    /// Opens the store at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets how often waiting downloads poll.
    #[must_use]
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    async fn find(&self, transfer: &TransferId) -> Result<Option<(String, PathBuf)>> {
        let dir = self.root.join(transfer.to_hex());
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                let name = entry.file_name().to_string_lossy().into_owned();
                return Ok(Some((name, entry.path())));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl TransferEngine for LocalSwarm {
    async fn seed(&self, path: &Path) -> Result<TransferId> {
        let name = file_name(path)?;
        let content = fs::read(path).await?;
        let id = transfer_id(&name, &content);

        let dest = self.root.join(id.to_hex());
        if fs::try_exists(&dest).await? {
            debug!(transfer = %id, "Already seeding");
            return Ok(id);
        }

        let staging = self.root.join(format!(".{}.{}", id.to_hex(), std::process::id()));
        fs::create_dir_all(&staging).await?;
        fs::write(staging.join(&name), &content).await?;
        if let Err(e) = fs::rename(&staging, &dest).await {
            // Another seeder may have won the race with identical content.
            if !fs::try_exists(&dest).await? {
                return Err(e.into());
            }
            fs::remove_dir_all(&staging).await?;
        }
        info!(transfer = %id, name = %name, bytes = content.len(), "Seeding");
        Ok(id)
    }

    async fn download(&self, transfer: &TransferId, into: &Path) -> Result<CompletedFile> {
        let (name, source) = loop {
            if let Some(found) = self.find(transfer).await? {
                break found;
            }
            tokio::time::sleep(self.poll).await;
        };
        fs::create_dir_all(into).await?;
        let path = into.join(&name);
        fs::copy(&source, &path).await?;
        debug!(transfer = %transfer, path = %path.display(), "Download complete");
        Ok(CompletedFile { name, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn seed_then_download_from_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("0123.pack");
        fs::write(&pack, b"PACK").await.unwrap();

        let seeder = LocalSwarm::new(dir.path().join("swarm"));
        let id = seeder.seed(&pack).await.unwrap();
        assert_eq!(id, transfer_id("0123.pack", b"PACK"));
        assert_eq!(seeder.seed(&pack).await.unwrap(), id);

        let leecher = LocalSwarm::new(dir.path().join("swarm"));
        let file = leecher.download(&id, &dir.path().join("dl")).await.unwrap();
        assert_eq!(file.name, "0123.pack");
        assert_eq!(fs::read(&file.path).await.unwrap(), b"PACK");
    }

    #[tokio::test]
    async fn download_polls_until_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let swarm = LocalSwarm::new(dir.path().join("swarm")).with_poll_interval(Duration::from_millis(10));
        let id = transfer_id("late.pack", b"late");

        let downloader = {
            let swarm = swarm.clone();
            let out = dir.path().join("dl");
            tokio::spawn(async move { swarm.download(&id, &out).await })
        };

        let pack = dir.path().join("late.pack");
        fs::write(&pack, b"late").await.unwrap();
        swarm.seed(&pack).await.unwrap();

        let file = downloader.await.unwrap().unwrap();
        assert_eq!(file.name, "late.pack");
    }
}
