//! Turning wanted object ids into ingested packs.
//!
//! One [`Orchestrator::request_objects`] call owns a goal per distinct id
//! and a single event loop. DHT peer reports, transfer notices from requester
//! wires, finished downloads and `index-pack` exits all arrive as
//! [`SessionEvent`]s; spawned tasks do the waiting and post back.

use crate::bridge::Fetcher;
use crate::{FetchGoal, PendingCount, Result};
use async_trait::async_trait;
use gittorrent_dht::{Dht, DhtEvent};
use gittorrent_git::{IngestOutcome, PackIngest};
use gittorrent_protocol::{Connector, PeerId, RequesterHandler, TransferNotice, Wire};
use gittorrent_swarm::{CompletedFile, TransferEngine};
use gittorrent_types::{ObjectId, TransferId};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Something that happened during a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The DHT reported a peer for an object id.
    Peer {
        /// Where the peer listens.
        addr: SocketAddr,
        /// The object id it announced.
        id: ObjectId,
    },
    /// A provider offered a transfer.
    Transfer(TransferNotice),
    /// A requester wire ended.
    WireClosed {
        /// The goal the wire served.
        id: ObjectId,
        /// The peer.
        addr: SocketAddr,
        /// Why it failed, if it did.
        error: Option<String>,
    },
    /// A pack finished downloading.
    Downloaded {
        /// The goal.
        id: ObjectId,
        /// The file on disk.
        file: CompletedFile,
    },
    /// A download failed. The goal does not retry.
    DownloadFailed {
        /// The goal.
        id: ObjectId,
        /// What went wrong.
        error: String,
    },
    /// `index-pack` exited.
    Ingested {
        /// The goal.
        id: ObjectId,
        /// Its exit status.
        outcome: IngestOutcome,
    },
    /// `index-pack` could not be run.
    IngestFailed {
        /// The goal.
        id: ObjectId,
        /// What went wrong.
        error: String,
    },
}

/// How a fetch went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Final state of every goal.
    pub goals: Vec<FetchGoal>,
    /// Downloads started.
    pub downloads: usize,
    /// Packs `index-pack` accepted.
    pub ingested: usize,
    /// Packs `index-pack` rejected or could not process.
    pub rejected: usize,
}

impl FetchReport {
    /// The goal for `id`, if one was created.
    #[must_use]
    pub fn goal(&self, id: &ObjectId) -> Option<&FetchGoal> {
        self.goals.iter().find(|g| g.id == *id)
    }
}

/// Fetches objects through the DHT, peer wires and the transfer engine.
pub struct Orchestrator {
    dht: Arc<dyn Dht>,
    swarm: Arc<dyn TransferEngine>,
    connector: Arc<dyn Connector>,
    ingest: Arc<dyn PackIngest>,
    download_dir: PathBuf,
    local: PeerId,
}

impl Orchestrator {
    /// Creates an orchestrator downloading packs into `download_dir`.
    #[must_use]
    pub fn new(
        dht: Arc<dyn Dht>,
        swarm: Arc<dyn TransferEngine>,
        connector: Arc<dyn Connector>,
        ingest: Arc<dyn PackIngest>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dht,
            swarm,
            connector,
            ingest,
            download_dir: download_dir.into(),
            local: PeerId::generate(),
        }
    }

    /// Fetches every wanted `(object id, ref name)` pair.
    ///
    /// Returns once every goal has seen a peer and been through `index-pack`.
    /// A goal no peer ever answers for keeps the call waiting: there is no
    /// timeout.
    ///
    /// # Errors
    ///
    /// Does not currently fail; lookup, wire, download and ingest failures
    /// are logged.
    pub async fn request_objects<I>(&self, wanted: I) -> Result<FetchReport>
    where
        I: IntoIterator<Item = (ObjectId, String)>,
    {
        // Subscribe before any lookup so no peer report is missed.
        let mut peers = self.dht.subscribe();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let (notices_tx, mut notices) = mpsc::unbounded_channel();

        let mut session = Session {
            orchestrator: self,
            goals: HashMap::new(),
            order: Vec::new(),
            lookups: VecDeque::new(),
            pending: PendingCount::default(),
            report: FetchReport::default(),
            events: events_tx,
            notices: notices_tx,
        };

        for (id, ref_name) in wanted {
            if session.add_goal(id, &ref_name) {
                session.lookups.push_back(id);
            }
        }

        // Lookups go out one at a time, and peer reports are drained between
        // them, so a large request cannot overrun the DHT event buffer.
        let mut dht_open = true;
        while !session.is_complete() {
            let event = tokio::select! {
                biased;
                peer = peers.recv(), if dht_open => match peer {
                    Ok(DhtEvent::Peer { addr, id }) => SessionEvent::Peer { addr, id },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed DHT events; looking up unseen goals again");
                        session.requeue_unseen();
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        warn!("DHT event stream closed");
                        dht_open = false;
                        continue;
                    }
                },
                Some(notice) = notices.recv() => SessionEvent::Transfer(notice),
                Some(event) = events.recv() => event,
                () = std::future::ready(()), if !session.lookups.is_empty() => {
                    if let Some(id) = session.lookups.pop_front() {
                        self.lookup(&id).await;
                    }
                    continue;
                }
            };
            session.handle(event);
        }

        Ok(session.into_report())
    }

    async fn lookup(&self, id: &ObjectId) {
        debug!(id = %id, "Looking up peers");
        if let Err(e) = self.dht.lookup(id).await {
            warn!(id = %id, error = %e, "Lookup failed");
        }
    }
}

#[async_trait]
impl Fetcher for Orchestrator {
    async fn fetch(&mut self, wanted: Vec<(ObjectId, String)>) -> Result<FetchReport> {
        self.request_objects(wanted).await
    }
}

/// State of one `request_objects` call.
struct Session<'a> {
    orchestrator: &'a Orchestrator,
    goals: HashMap<ObjectId, FetchGoal>,
    order: Vec<ObjectId>,
    lookups: VecDeque<ObjectId>,
    pending: PendingCount,
    report: FetchReport,
    events: mpsc::UnboundedSender<SessionEvent>,
    notices: mpsc::UnboundedSender<TransferNotice>,
}

impl Session<'_> {
    /// Records a wanted pair. Returns true if this created the goal.
    fn add_goal(&mut self, id: ObjectId, ref_name: &str) -> bool {
        if let Some(goal) = self.goals.get_mut(&id) {
            goal.add_branch(ref_name);
            return false;
        }
        self.goals.insert(id, FetchGoal::new(id, ref_name));
        self.order.push(id);
        true
    }

    /// Queues a fresh lookup for every goal still without a peer.
    fn requeue_unseen(&mut self) {
        let goals = &self.goals;
        self.lookups = self
            .order
            .iter()
            .filter(|id| goals.get(id).is_some_and(|g| !g.peer_seen))
            .copied()
            .collect();
    }

    fn is_complete(&self) -> bool {
        self.pending.is_zero() && self.goals.values().all(|g| g.peer_seen)
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Peer { addr, id } => self.on_peer(addr, id),
            SessionEvent::Transfer(notice) => self.on_transfer(notice),
            SessionEvent::WireClosed { id, addr, error } => match error {
                Some(error) => warn!(id = %id, peer = %addr, error = %error, "Peer wire failed"),
                None => debug!(id = %id, peer = %addr, "Peer wire closed"),
            },
            SessionEvent::Downloaded { id, file } => {
                info!(id = %id, path = %file.path.display(), "Download complete");
                self.spawn_ingest(id, file.path);
            }
            SessionEvent::DownloadFailed { id, error } => {
                warn!(id = %id, error = %error, "Download failed");
            }
            SessionEvent::Ingested { id, outcome } => {
                if outcome.success() {
                    info!(id = %id, "Pack ingested");
                    self.report.ingested += 1;
                } else {
                    warn!(id = %id, code = ?outcome.code, "index-pack rejected pack");
                    self.report.rejected += 1;
                }
                self.finish(id);
            }
            SessionEvent::IngestFailed { id, error } => {
                warn!(id = %id, error = %error, "index-pack could not run");
                self.report.rejected += 1;
                self.finish(id);
            }
        }
    }

    fn on_peer(&mut self, addr: SocketAddr, id: ObjectId) {
        let Some(goal) = self.goals.get_mut(&id) else {
            return;
        };
        if goal.see_peer() {
            self.pending.increment();
            info!(id = %id, peer = %addr, pending = self.pending.get(), "Found first peer");
        }
        if goal.got || !goal.addrs.insert(addr) {
            return;
        }

        let connector = Arc::clone(&self.orchestrator.connector);
        let local = self.orchestrator.local;
        let notices = self.notices.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let error = run_requester(connector.as_ref(), addr, id, local, notices)
                .await
                .err()
                .map(|e| e.to_string());
            // The session may already be over.
            let _ = events.send(SessionEvent::WireClosed { id, addr, error });
        });
    }

    fn on_transfer(&mut self, notice: TransferNotice) {
        let Some(goal) = self.goals.get_mut(&notice.id) else {
            return;
        };
        if !goal.take_transfer(notice.transfer) {
            debug!(id = %notice.id, peer = %notice.peer, "Ignoring later transfer offer");
            return;
        }
        self.report.downloads += 1;
        self.spawn_download(notice.id, notice.transfer);
    }

    fn spawn_download(&self, id: ObjectId, transfer: TransferId) {
        let swarm = Arc::clone(&self.orchestrator.swarm);
        let dir = self.orchestrator.download_dir.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            debug!(id = %id, transfer = %transfer, "Downloading");
            let event = match swarm.download(&transfer, &dir).await {
                Ok(file) => SessionEvent::Downloaded { id, file },
                Err(e) => SessionEvent::DownloadFailed {
                    id,
                    error: e.to_string(),
                },
            };
            let _ = events.send(event);
        });
    }

    fn spawn_ingest(&self, id: ObjectId, path: PathBuf) {
        let ingest = Arc::clone(&self.orchestrator.ingest);
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match ingest.ingest(&path).await {
                Ok(outcome) => SessionEvent::Ingested { id, outcome },
                Err(e) => SessionEvent::IngestFailed {
                    id,
                    error: e.to_string(),
                },
            };
            let _ = events.send(event);
        });
    }

    fn finish(&mut self, id: ObjectId) {
        if let Some(goal) = self.goals.get_mut(&id) {
            if goal.peer_seen && goal.finish() {
                self.pending.decrement();
            }
        }
    }

    fn into_report(mut self) -> FetchReport {
        let mut goals = std::mem::take(&mut self.goals);
        self.report.goals = self.order.iter().filter_map(|id| goals.remove(id)).collect();
        self.report
    }
}

async fn run_requester(
    connector: &dyn Connector,
    addr: SocketAddr,
    id: ObjectId,
    local: PeerId,
    notices: mpsc::UnboundedSender<TransferNotice>,
) -> gittorrent_protocol::Result<()> {
    let stream = connector.connect(addr).await?;
    let mut wire = Wire::new(stream, local);
    wire.register(Box::new(RequesterHandler::new(id, addr, notices)))?;
    wire.run(true).await
}

