//! In-process DHT, shared by cloning the handle.

use crate::{Dht, DhtError, DhtEvent, MutableItem, Result, SignedRecord};
use async_trait::async_trait;
use gittorrent_types::{ObjectId, RecordKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Default)]
struct Table {
    records: HashMap<RecordKey, MutableItem>,
    peers: HashMap<ObjectId, Vec<SocketAddr>>,
    lookups: HashMap<ObjectId, usize>,
}

struct Shared {
    table: RwLock<Table>,
    events: broadcast::Sender<DhtEvent>,
    puts: AtomicUsize,
    fail_lookups: AtomicBool,
}

/// A DHT living in memory.
///
/// Clones share one table and one event channel; each clone announces from
/// its own host address (see [`MemoryDht::with_host`]).
#[derive(Clone)]
pub struct MemoryDht {
    shared: Arc<Shared>,
    host: IpAddr,
}

impl MemoryDht {
    /// Creates an empty DHT whose handle announces from `127.0.0.1`.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            shared: Arc::new(Shared {
                table: RwLock::new(Table::default()),
                events,
                puts: AtomicUsize::new(0),
                fail_lookups: AtomicBool::new(false),
            }),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    /// Returns a handle on the same DHT that announces from `host`.
    #[must_use]
    pub fn with_host(&self, host: IpAddr) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            host,
        }
    }

    /// Makes every subsequent lookup fail.
    pub fn fail_lookups(&self, fail: bool) {
        self.shared.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Number of lookups issued for `id`.
    #[must_use]
    pub fn lookup_count(&self, id: &ObjectId) -> usize {
        self.shared.table.read().lookups.get(id).copied().unwrap_or(0)
    }

    /// Number of successful puts.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.shared.puts.load(Ordering::SeqCst)
    }

    /// Peers announced for `id`.
    #[must_use]
    pub fn peers(&self, id: &ObjectId) -> Vec<SocketAddr> {
        self.shared.table.read().peers.get(id).cloned().unwrap_or_default()
    }

    /// Stores a raw item without any checks.
    pub fn insert_raw(&self, key: RecordKey, item: MutableItem) {
        self.shared.table.write().records.insert(key, item);
    }
}

impl Default for MemoryDht {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dht for MemoryDht {
    async fn ready(&self) -> Result<()> {
        Ok(())
    }

    async fn announce(&self, id: &ObjectId, port: u16) -> Result<()> {
        let addr = SocketAddr::new(self.host, port);
        let mut table = self.shared.table.write();
        let peers = table.peers.entry(*id).or_default();
        if !peers.contains(&addr) {
            peers.push(addr);
        }
        debug!(id = %id, addr = %addr, "Announced");
        Ok(())
    }

    async fn lookup(&self, id: &ObjectId) -> Result<()> {
        let peers = {
            let mut table = self.shared.table.write();
            *table.lookups.entry(*id).or_default() += 1;
            if self.shared.fail_lookups.load(Ordering::SeqCst) {
                return Err(DhtError::LookupFailed(format!("lookup for {id} refused")));
            }
            table.peers.get(id).cloned().unwrap_or_default()
        };
        for addr in peers {
            // No receivers is not an error for a lookup.
            let _ = self.shared.events.send(DhtEvent::Peer { addr, id: *id });
        }
        Ok(())
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<MutableItem>> {
        Ok(self.shared.table.read().records.get(key).cloned())
    }

    async fn put(&self, record: &SignedRecord) -> Result<RecordKey> {
        record.verify()?;
        let key = record.key();
        self.shared
            .table
            .write()
            .records
            .insert(key, MutableItem::from(record));
        self.shared.puts.fetch_add(1, Ordering::SeqCst);
        Ok(key)
    }

    fn subscribe(&self) -> broadcast::Receiver<DhtEvent> {
        self.shared.events.subscribe()
    }
}
