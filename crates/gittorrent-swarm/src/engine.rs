//! The transfer engine interface.

use crate::{Result, SwarmError};
use async_trait::async_trait;
use gittorrent_types::TransferId;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

/// A downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFile {
    /// File name as seeded.
    pub name: String,
    /// Where the file now is.
    pub path: PathBuf,
}

/// Seeds and downloads whole files.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Starts seeding the file at `path`.
    async fn seed(&self, path: &Path) -> Result<TransferId>;

    /// Downloads the file seeded under `transfer` into `into`.
    ///
    /// Waits for as long as it takes: there is no timeout.
    async fn download(&self, transfer: &TransferId, into: &Path) -> Result<CompletedFile>;
}

/// Transfer id of a named file: SHA-1 over the name, a zero byte, and the content.
#[must_use]
pub fn transfer_id(name: &str, content: &[u8]) -> TransferId {
    let mut hasher = Sha1::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(content);
    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    TransferId::from_bytes(out)
}

pub(crate) fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| SwarmError::NotAFile(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_id_depends_on_name_and_content() {
        let a = transfer_id("x.pack", b"PACK");
        assert_eq!(a, transfer_id("x.pack", b"PACK"));
        assert_ne!(a, transfer_id("y.pack", b"PACK"));
        assert_ne!(a, transfer_id("x.pack", b"PACK2"));
        assert_ne!(transfer_id("ab", b"c"), transfer_id("a", b"bc"));
    }

    #[test]
    fn file_name_of_root_is_an_error() {
        assert!(file_name(Path::new("/")).is_err());
        assert_eq!(file_name(Path::new("/tmp/a.pack")).unwrap(), "a.pack");
    }
}
