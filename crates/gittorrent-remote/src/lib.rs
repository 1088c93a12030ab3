//! # gittorrent Remote
//!
//! The client side of gittorrent, run by git as `git-remote-gittorrent`.
//!
//! - [`RemoteUrl`]: `gittorrent://<key>/<repo>` versus plain URLs.
//! - [`Orchestrator`]: turns wanted object ids into DHT lookups, peer wires,
//!   downloads and `index-pack` runs.
//! - [`Bridge`]: the line protocol git speaks to remote helpers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bridge;
mod error;
mod goal;
mod orchestrator;
mod url;

pub use bridge::{Bridge, BridgeExit, BridgeState, Fetcher};
pub use error::{RemoteError, Result};
pub use goal::{FetchGoal, PendingCount};
pub use orchestrator::{FetchReport, Orchestrator, SessionEvent};
pub use url::RemoteUrl;
