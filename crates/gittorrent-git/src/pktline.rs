//! pkt-line framing, as spoken by `git upload-pack`.
//!
//! Each packet is a 4-digit hex length (counting the prefix itself) followed
//! by the payload; `0000` is a flush packet.

use crate::{GitError, Result};
use std::io::{ErrorKind, Read, Write};

/// Largest packet git will produce, prefix included.
pub const MAX_PKT_LEN: usize = 65520;

/// One packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// A payload.
    Data(Vec<u8>),
    /// `0000`.
    Flush,
}

impl Packet {
    /// Payload text without its trailing newline, if it is UTF-8 data.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Data(data) => std::str::from_utf8(data).ok().map(|s| s.trim_end_matches('\n')),
            Self::Flush => None,
        }
    }
}

/// Reads packets from a byte stream.
pub struct PacketReader<R> {
    inner: R,
}

impl<R: Read> PacketReader<R> {
    /// Wraps a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads one packet; `None` at a clean end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error on a bad length prefix or a truncated payload.
    pub fn read_packet(&mut self) -> Result<Option<Packet>> {
        let mut prefix = [0u8; 4];
        match self.inner.read_exact(&mut prefix) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = std::str::from_utf8(&prefix)
            .ok()
            .and_then(|s| usize::from_str_radix(s, 16).ok())
            .ok_or_else(|| GitError::InvalidPktLine(format!("bad length prefix {prefix:?}")))?;

        match len {
            0 => Ok(Some(Packet::Flush)),
            1..=3 => Err(GitError::InvalidPktLine(format!("reserved length {len:04x}"))),
            _ if len > MAX_PKT_LEN => Err(GitError::InvalidPktLine(format!("length {len} over limit"))),
            _ => {
                let mut data = vec![0u8; len - 4];
                self.inner.read_exact(&mut data)?;
                Ok(Some(Packet::Data(data)))
            }
        }
    }

    /// Reads packets up to and excluding the next flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream ends first or a packet is invalid.
    pub fn read_section(&mut self) -> Result<Vec<Packet>> {
        let mut packets = Vec::new();
        loop {
            match self.read_packet()? {
                Some(Packet::Flush) => return Ok(packets),
                Some(packet) => packets.push(packet),
                None => return Err(GitError::Protocol("stream ended before flush".into())),
            }
        }
    }

    /// Gives back the reader, positioned right after the last packet read.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes `line` as one data packet, appending a newline if missing.
///
/// # Errors
///
/// Returns an error if the line is too long or the write fails.
pub fn write_line<W: Write>(out: &mut W, line: &str) -> Result<()> {
    let newline = usize::from(!line.ends_with('\n'));
    let len = 4 + line.len() + newline;
    if len > MAX_PKT_LEN {
        return Err(GitError::InvalidPktLine(format!("line of {len} bytes over limit")));
    }
    write!(out, "{len:04x}{line}")?;
    if newline == 1 {
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Writes a flush packet.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn write_flush<W: Write>(out: &mut W) -> Result<()> {
    out.write_all(b"0000")?;
    Ok(())
}
