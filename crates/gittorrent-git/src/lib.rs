//! git subprocesses as gittorrent uses them.
//!
//! gittorrent never parses pack data itself. It lists refs with
//! `git ls-remote`, produces packs by driving `git upload-pack` through a v0
//! fetch negotiation, and verifies downloaded packs by feeding them to
//! `git index-pack`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod git;
mod index_pack;
mod ls_remote;
pub mod pktline;
mod scan;
mod upload_pack;

pub use error::{GitError, Result};
pub use git::Git;
pub use index_pack::{IndexPack, IngestOutcome, PackIngest};
pub use ls_remote::{parse_ls_remote, RemoteRef};
pub use scan::{scan_repositories, ExportedRepository, EXPORT_OK};
pub use upload_pack::PackRequest;
