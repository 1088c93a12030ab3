//! Logging for gittorrent processes.
//!
//! Both binaries log to stderr; the remote helper's stdout belongs to git.

mod logging;

pub use logging::{init_logging, LogFormat};
