//! The DHT, transfer engine and connector a process runs against.

use crate::Config;
use gittorrent_dht::{Dht, LocalDht};
use gittorrent_protocol::{Connector, TcpConnector};
use gittorrent_swarm::{LocalSwarm, TransferEngine};
use std::sync::Arc;

/// Shared handles to the network-facing services.
#[derive(Clone)]
pub struct Backends {
    /// Peer discovery and signed records.
    pub dht: Arc<dyn Dht>,
    /// Pack transfer.
    pub swarm: Arc<dyn TransferEngine>,
    /// Opens peer wires.
    pub connector: Arc<dyn Connector>,
}

impl Backends {
    /// Bundles already-built backends.
    #[must_use]
    pub fn new(dht: Arc<dyn Dht>, swarm: Arc<dyn TransferEngine>, connector: Arc<dyn Connector>) -> Self {
        Self { dht, swarm, connector }
    }

    /// Directory-backed DHT and swarm, TCP wires.
    ///
    /// Processes sharing the configured state directories see each other's
    /// announcements, records and seeded packs.
    #[must_use]
    pub fn local(config: &Config) -> Self {
        Self::new(
            Arc::new(LocalDht::new(config.dht.state_dir.clone(), config.dht.host)),
            Arc::new(LocalSwarm::new(config.swarm.dir.clone())),
            Arc::new(TcpConnector),
        )
    }
}
