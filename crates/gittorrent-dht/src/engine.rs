//! The DHT interface the rest of gittorrent is written against.

use crate::{MutableItem, Result, SignedRecord};
use async_trait::async_trait;
use gittorrent_types::{ObjectId, RecordKey};
use std::net::SocketAddr;
use tokio::sync::broadcast;

/// Something the DHT tells its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhtEvent {
    /// A peer announced itself for `id`.
    Peer {
        /// Where to connect.
        addr: SocketAddr,
        /// The swarm id (an object id) the peer announced.
        id: ObjectId,
    },
}

/// A DHT handle.
///
/// Lookups do not return peers directly: they arrive as [`DhtEvent::Peer`]
/// on every receiver obtained from [`Dht::subscribe`], possibly long after
/// `lookup` returns. Subscribe before looking up.
#[async_trait]
pub trait Dht: Send + Sync {
    /// Waits until the DHT can serve requests.
    async fn ready(&self) -> Result<()>;

    /// Announces that this node serves `id` on TCP `port`.
    async fn announce(&self, id: &ObjectId, port: u16) -> Result<()>;

    /// Starts a peer lookup for `id`.
    async fn lookup(&self, id: &ObjectId) -> Result<()>;

    /// Fetches the mutable item stored under `key`.
    async fn get(&self, key: &RecordKey) -> Result<Option<MutableItem>>;

    /// Stores a signed record, replacing whatever was stored under its key.
    async fn put(&self, record: &SignedRecord) -> Result<RecordKey>;

    /// Returns a receiver for DHT events.
    fn subscribe(&self) -> broadcast::Receiver<DhtEvent>;
}
