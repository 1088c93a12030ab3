//! Pack generation by driving `git upload-pack` through a v0 fetch.

use crate::pktline::{write_flush, write_line, PacketReader};
use crate::{Git, GitError, Result};
use gittorrent_types::ObjectId;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// What to pack and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequest {
    /// Repository to pack from.
    pub repository: PathBuf,
    /// The object the pack must let the receiver reach.
    pub want: ObjectId,
    /// An object the receiver is assumed to have, for a thinner pack.
    pub have: Option<ObjectId>,
    /// File the raw pack stream is written to.
    pub output: PathBuf,
}

impl Git {
    /// Generates a pack for `request` and returns its size in bytes.
    ///
    /// The negotiation is blocking pipe I/O, so it runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an error if upload-pack cannot be started, the negotiation
    /// fails, or upload-pack exits unsuccessfully.
    pub async fn generate_pack(&self, request: PackRequest) -> Result<u64> {
        let git = self.clone();
        tokio::task::spawn_blocking(move || git.generate_pack_blocking(&request))
            .await
            .map_err(|e| GitError::Io(io::Error::other(e)))?
    }

    fn generate_pack_blocking(&self, request: &PackRequest) -> Result<u64> {
        let mut child = Command::new(self.program())
            .arg("upload-pack")
            .arg(&request.repository)
            .env_remove("GIT_PROTOCOL")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let negotiated = (|| {
            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| GitError::Protocol("upload-pack stdin unavailable".into()))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| GitError::Protocol("upload-pack stdout unavailable".into()))?;
            negotiate(stdin, BufReader::new(stdout), request)
        })();

        let status = child.wait()?;
        let size = negotiated?;
        Git::check("git upload-pack", status)?;
        debug!(want = %request.want, bytes = size, path = %request.output.display(), "Pack written");
        Ok(size)
    }
}

fn negotiate<W: Write, R: io::Read>(mut stdin: W, stdout: R, request: &PackRequest) -> Result<u64> {
    let mut reader = PacketReader::new(stdout);
    let advertisement = reader.read_section()?;
    if advertisement.is_empty() {
        return Err(GitError::Protocol("repository advertises no refs".into()));
    }

    write_line(&mut stdin, &format!("want {}", request.want))?;
    write_flush(&mut stdin)?;
    if let Some(have) = request.have.filter(|h| *h != request.want) {
        write_line(&mut stdin, &format!("have {have}"))?;
    }
    write_line(&mut stdin, "done")?;
    stdin.flush()?;
    drop(stdin);

    let ack = reader
        .read_packet()?
        .ok_or_else(|| GitError::Protocol("upload-pack closed before acknowledging".into()))?;
    match ack.text() {
        Some(text) if text == "NAK" || text.starts_with("ACK ") => {}
        other => {
            return Err(GitError::Protocol(format!(
                "expected ACK or NAK, got {}",
                other.unwrap_or("flush")
            )))
        }
    }

    let mut out = BufWriter::new(File::create(&request.output)?);
    let mut rest = reader.into_inner();
    let size = io::copy(&mut rest, &mut out)?;
    out.flush()?;
    Ok(size)
}
