//! The periodic publish cycle: scan, announce, sign, put.

use crate::{AnnouncedIndex, IndexHandle, Result};
use gittorrent_dht::{publish, Dht, DhtError};
use gittorrent_git::{scan_repositories, Git};
use gittorrent_identity::Keypair;
use gittorrent_types::{refs, ObjectId, RecordKey, RepositoryDirectory};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What one publish cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Exported repositories listed successfully.
    pub repositories: usize,
    /// Published refs across those repositories.
    pub refs: usize,
    /// Object ids announced for the first time this cycle.
    pub newly_announced: usize,
    /// Key the directory went out under; `None` if the publish was skipped.
    pub published: Option<RecordKey>,
}

/// Owns the server's signing key and keeps the DHT current.
pub struct Publisher {
    dht: Arc<dyn Dht>,
    keypair: Keypair,
    git: Git,
    root: PathBuf,
    port: u16,
    index: IndexHandle,
    announced: HashSet<ObjectId>,
}

impl Publisher {
    /// Creates a publisher scanning `root` and announcing `port`.
    #[must_use]
    pub fn new(
        dht: Arc<dyn Dht>,
        keypair: Keypair,
        git: Git,
        root: impl Into<PathBuf>,
        port: u16,
        index: IndexHandle,
    ) -> Self {
        Self {
            dht,
            keypair,
            git,
            root: root.into(),
            port,
            index,
            announced: HashSet::new(),
        }
    }

    /// Runs one cycle.
    ///
    /// Repositories whose listing fails are skipped. Each object id is
    /// announced once per process; a failed announcement is retried next
    /// cycle. The rebuilt index is installed before any announcement goes
    /// out, so an announced object is always servable. A directory over the
    /// DHT value ceiling is logged and not put.
    ///
    /// # Errors
    ///
    /// Returns an error only if the scan root cannot be read.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        let mut directory = RepositoryDirectory::new();
        let mut index = AnnouncedIndex::new();
        let mut to_announce = Vec::new();

        for repo in scan_repositories(&self.root)? {
            let listed = match self.git.ls_remote(&repo.path.to_string_lossy()).await {
                Ok(listed) => listed,
                Err(e) => {
                    warn!(repository = %repo.name, error = %e, "Skipping repository");
                    continue;
                }
            };
            report.repositories += 1;

            directory.add_repository(repo.name.as_str());
            for r in listed.iter().filter(|r| refs::is_published(&r.name)) {
                directory.insert(repo.name.as_str(), r.name.as_str(), r.id);
                report.refs += 1;
                if !self.announced.contains(&r.id) && !to_announce.contains(&r.id) {
                    to_announce.push(r.id);
                }
            }
            index.insert_repository(&repo.path, &listed);
        }

        // Installed before announcing: a peer may ask as soon as it hears.
        self.index.replace(index);

        for id in to_announce {
            match self.dht.announce(&id, self.port).await {
                Ok(()) => {
                    debug!(id = %id, "Announced object");
                    self.announced.insert(id);
                    report.newly_announced += 1;
                }
                Err(e) => warn!(id = %id, error = %e, "Announce failed"),
            }
        }

        report.published = match publish(self.dht.as_ref(), &directory, &self.keypair).await {
            Ok(key) => Some(key),
            Err(DhtError::DirectoryTooLarge { size, max }) => {
                error!(size, max, "Directory too large to publish; skipped");
                None
            }
            Err(e) => {
                warn!(error = %e, "Publish failed");
                None
            }
        };

        info!(
            repositories = report.repositories,
            refs = report.refs,
            newly_announced = report.newly_announced,
            published = report.published.is_some(),
            "Publish cycle complete"
        );
        Ok(report)
    }

    /// Runs a cycle immediately and then every `every`, forever.
    pub async fn run_periodic(mut self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                error!(root = %self.root.display(), error = %e, "Publish cycle failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gittorrent_dht::{record_key, resolve, MemoryDht};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn empty_root_publishes_empty_directory() {
        let root = tempfile::tempdir().unwrap();
        let dht = MemoryDht::new();
        let keypair = Keypair::generate();
        let expected = record_key(&keypair.public_key());
        let index = IndexHandle::new();

        let mut publisher = Publisher::new(
            Arc::new(dht.clone()),
            keypair,
            Git::default(),
            root.path(),
            6882,
            index.clone(),
        );
        let report = publisher.run_cycle().await.unwrap();

        assert_eq!(report.published, Some(expected));
        assert_eq!(report.repositories, 0);
        assert_eq!(dht.put_count(), 1);
        assert!(index.current().is_empty());

        let directory = resolve(&dht, &expected.to_hex()).await.unwrap();
        assert!(directory.is_empty());
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let mut publisher = Publisher::new(
            Arc::new(MemoryDht::new()),
            Keypair::generate(),
            Git::default(),
            root.path().join("absent"),
            6882,
            IndexHandle::new(),
        );
        assert!(publisher.run_cycle().await.is_err());
    }
}
