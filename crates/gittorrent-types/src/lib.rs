//! Common types used throughout `gittorrent`.
//!
//! Git object ids double as swarm identifiers in gittorrent, so the same
//! 20-byte [`ObjectId`] names a commit in a repository, a key in the DHT
//! peer table, and the subject of an `ask` on a peer wire.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod id;
pub mod refs;

pub use directory::{RefMap, RepositoryDirectory};
pub use error::{Result, TypesError};
pub use id::{ObjectId, RecordKey, TransferId};
