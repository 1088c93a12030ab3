//! # gittorrent DHT
//!
//! Everything gittorrent needs from a DHT, behind the [`Dht`] trait:
//!
//! - **Peer discovery**: nodes `announce` the object ids they can serve and
//!   consumers `lookup` an object id, receiving [`DhtEvent::Peer`] events.
//! - **Signed directories**: a node stores its [`RepositoryDirectory`] as a
//!   mutable item signed with its long-term key ([`publish`]); consumers fetch
//!   it by [`RecordKey`] ([`resolve`]).
//!
//! Two backends ship with the crate: [`MemoryDht`] for in-process use and
//! [`LocalDht`], a table kept under a directory so that processes on one host
//! can find each other.
//!
//! [`RepositoryDirectory`]: gittorrent_types::RepositoryDirectory
//! [`RecordKey`]: gittorrent_types::RecordKey

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod engine;
mod error;
mod local;
mod memory;
mod publisher;
mod record;
mod resolver;

pub use codec::MAX_VALUE_SIZE;
pub use engine::{Dht, DhtEvent};
pub use error::{DhtError, Result};
pub use local::LocalDht;
pub use memory::MemoryDht;
pub use publisher::publish;
pub use record::{record_key, MutableItem, SignedRecord};
pub use resolver::resolve;
