//! # gittorrent Swarm
//!
//! Moves pack files between peers. A provider seeds a file and gets a
//! [`TransferId`]; a requester downloads by that id and is told when the named
//! file is complete.
//!
//! [`MemorySwarm`] keeps seeded files in memory for in-process use;
//! [`LocalSwarm`] keeps them under a directory shared by processes on one host.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod local;
mod memory;

pub use engine::{transfer_id, CompletedFile, TransferEngine};
pub use error::{Result, SwarmError};
pub use gittorrent_types::TransferId;
pub use local::LocalSwarm;
pub use memory::MemorySwarm;
