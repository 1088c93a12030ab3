//! # gittorrent Node
//!
//! Runtime shared by both gittorrent binaries, plus the server role.
//!
//! - [`config`]: layered configuration (defaults, `config.yaml`, environment).
//! - [`observability`]: logging to stderr.
//! - [`Backends`]: the DHT, transfer engine and connector a process uses.
//! - Server role: [`AnnouncedIndex`], the periodic [`Publisher`], the
//!   [`GitPackPipeline`] behind provider connections, and [`serve`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backends;
pub mod config;
mod error;
mod index;
pub mod observability;
mod provider;
mod publish;
mod server;

pub use backends::Backends;
pub use config::Config;
pub use error::{NodeError, Result};
pub use index::{AnnouncedIndex, IndexHandle};
pub use provider::GitPackPipeline;
pub use publish::{CycleReport, Publisher};
pub use server::{handle_connection, serve, serve_memory};
