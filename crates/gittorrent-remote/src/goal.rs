//! Per-object fetch bookkeeping.

use gittorrent_types::{refs, ObjectId, TransferId};
use std::collections::{BTreeSet, HashSet};
use std::net::SocketAddr;
use tracing::error;

/// Everything known about fetching one object id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchGoal {
    /// The wanted object, also its swarm id.
    pub id: ObjectId,
    /// A transfer id has been obtained.
    pub got: bool,
    /// At least one peer has been reported for the id.
    pub peer_seen: bool,
    /// Branch names this object was requested for.
    pub branches: BTreeSet<String>,
    /// The transfer governing the download; the first one obtained wins.
    pub transfer: Option<TransferId>,
    /// Peers a wire was opened to.
    pub addrs: HashSet<SocketAddr>,
    /// `index-pack` has exited for this goal.
    pub ingested: bool,
}

impl FetchGoal {
    /// Creates a goal for `id`, requested for the ref `ref_name`.
    #[must_use]
    pub fn new(id: ObjectId, ref_name: &str) -> Self {
        Self {
            id,
            got: false,
            peer_seen: false,
            branches: BTreeSet::from([refs::branch_name(ref_name)]),
            transfer: None,
            addrs: HashSet::new(),
            ingested: false,
        }
    }

    /// Adds another ref the object was requested for.
    pub fn add_branch(&mut self, ref_name: &str) {
        self.branches.insert(refs::branch_name(ref_name));
    }

    /// Marks the first peer as seen. Returns true only on the first call.
    pub fn see_peer(&mut self) -> bool {
        !std::mem::replace(&mut self.peer_seen, true)
    }

    /// Takes `transfer` unless one was already taken. Returns true if it was.
    pub fn take_transfer(&mut self, transfer: TransferId) -> bool {
        if self.transfer.is_some() {
            return false;
        }
        self.transfer = Some(transfer);
        self.got = true;
        true
    }

    /// Marks the goal ingested. Returns true only on the first call.
    pub fn finish(&mut self) -> bool {
        !std::mem::replace(&mut self.ingested, true)
    }
}

/// Goals with a peer that have not finished ingesting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCount(usize);

impl PendingCount {
    /// Current value.
    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }

    /// Whether nothing is outstanding.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// One more goal outstanding.
    pub fn increment(&mut self) {
        self.0 += 1;
    }

    /// One goal finished. Refuses to go below zero and returns false instead.
    pub fn decrement(&mut self) -> bool {
        if let Some(n) = self.0.checked_sub(1) {
            self.0 = n;
            true
        } else {
            error!("Pending count would go negative; ignoring decrement");
            false
        }
    }
}
