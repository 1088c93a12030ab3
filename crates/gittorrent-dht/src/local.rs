//! A DHT table kept on the local filesystem.
//!
//! Layout under the state directory:
//!
//! ```text
//! records/<record-key>.json   one MutableItem per publisher
//! peers/<object-id>           one "ip:port" line per announcing node
//! ```
//!
//! Processes on one host that point at the same directory see each other's
//! records and announcements.

use crate::{Dht, DhtError, DhtEvent, MutableItem, Result, SignedRecord};
use async_trait::async_trait;
use gittorrent_types::{ObjectId, RecordKey};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Filesystem-backed DHT.
#[derive(Clone)]
pub struct LocalDht {
    root: PathBuf,
    host: IpAddr,
    events: broadcast::Sender<DhtEvent>,
}

impl LocalDht {
    /// Opens the table at `root`; announcements carry `host`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, host: IpAddr) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            root: root.into(),
            host,
            events,
        }
    }

    fn record_path(&self, key: &RecordKey) -> PathBuf {
        self.root.join("records").join(format!("{}.json", key.to_hex()))
    }

    fn peers_path(&self, id: &ObjectId) -> PathBuf {
        self.root.join("peers").join(id.to_hex())
    }

    async fn read_peers(&self, id: &ObjectId) -> Result<Vec<SocketAddr>> {
        let text = match fs::read_to_string(self.peers_path(id)).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut peers = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            match line.trim().parse() {
                Ok(addr) => peers.push(addr),
                Err(_) => warn!(id = %id, line, "Skipping unparseable peer entry"),
            }
        }
        Ok(peers)
    }
}

/// Writes `contents` next to `path` and renames it into place.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl Dht for LocalDht {
    async fn ready(&self) -> Result<()> {
        fs::create_dir_all(self.root.join("records")).await?;
        fs::create_dir_all(self.root.join("peers")).await?;
        Ok(())
    }

    async fn announce(&self, id: &ObjectId, port: u16) -> Result<()> {
        let addr = SocketAddr::new(self.host, port);
        let mut peers = self.read_peers(id).await?;
        if peers.contains(&addr) {
            return Ok(());
        }
        peers.push(addr);
        let body: String = peers.iter().map(|p| format!("{p}\n")).collect();
        write_atomic(&self.peers_path(id), body.as_bytes()).await?;
        debug!(id = %id, addr = %addr, "Announced");
        Ok(())
    }

    async fn lookup(&self, id: &ObjectId) -> Result<()> {
        let peers = self
            .read_peers(id)
            .await
            .map_err(|e| DhtError::LookupFailed(e.to_string()))?;
        debug!(id = %id, peers = peers.len(), "Lookup finished");
        for addr in peers {
            let _ = self.events.send(DhtEvent::Peer { addr, id: *id });
        }
        Ok(())
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<MutableItem>> {
        match fs::read(self.record_path(key)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| DhtError::Malformed(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, record: &SignedRecord) -> Result<RecordKey> {
        record.verify()?;
        let key = record.key();
        let json = serde_json::to_vec(&MutableItem::from(record))?;
        write_atomic(&self.record_path(&key), &json).await?;
        Ok(key)
    }

    fn subscribe(&self) -> broadcast::Receiver<DhtEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gittorrent_identity::Keypair;
    use pretty_assertions::assert_eq;

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let dht = LocalDht::new(dir.path(), localhost());
        dht.ready().await.unwrap();

        let record = SignedRecord::sign(&Keypair::generate(), 0, b"{}".to_vec());
        let key = dht.put(&record).await.unwrap();

        let reopened = LocalDht::new(dir.path(), localhost());
        let item = reopened.get(&key).await.unwrap().unwrap();
        assert_eq!(SignedRecord::try_from(item).unwrap(), record);
    }

    #[tokio::test]
    async fn announcements_are_shared_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let server = LocalDht::new(dir.path(), localhost());
        server.ready().await.unwrap();
        let id = ObjectId::from_bytes([9; 20]);
        server.announce(&id, 7000).await.unwrap();
        server.announce(&id, 7000).await.unwrap();

        let client = LocalDht::new(dir.path(), localhost());
        let mut events = client.subscribe();
        client.lookup(&id).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            DhtEvent::Peer {
                addr: "127.0.0.1:7000".parse().unwrap(),
                id
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn lookup_of_unknown_id_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let dht = LocalDht::new(dir.path(), localhost());
        dht.ready().await.unwrap();
        let mut events = dht.subscribe();
        dht.lookup(&ObjectId::from_bytes([1; 20])).await.unwrap();
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let dht = LocalDht::new(dir.path(), localhost());
        dht.ready().await.unwrap();
        assert_eq!(dht.get(&RecordKey::from_bytes([2; 20])).await.unwrap(), None);
    }
}
