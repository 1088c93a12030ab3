//! Extension messages and their framing.

use crate::{PeerId, ProtocolError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use gittorrent_types::{ObjectId, TransferId};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The name the extension registers under.
pub const EXTENSION_NAME: &str = "ut_gittorrent";

/// Largest accepted frame body.
pub const MAX_FRAME_SIZE: usize = 1024;

/// Message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Presence announcement.
    Handshake = 0,
    /// Requester asks for transfer metadata of an object.
    Ask = 1,
    /// Provider answers an ask.
    ReceivedTransfer = 2,
    /// Requester asks for a pack to be generated and seeded.
    GeneratePack = 3,
    /// Provider answers a generate request.
    SendTransfer = 4,
}

impl MessageType {
    /// Parses a message type from a byte.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown codes.
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Self::Handshake),
            1 => Ok(Self::Ask),
            2 => Ok(Self::ReceivedTransfer),
            3 => Ok(Self::GeneratePack),
            4 => Ok(Self::SendTransfer),
            _ => Err(ProtocolError::Malformed(format!("unknown message type: {b}"))),
        }
    }
}

/// A message of the `ut_gittorrent` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionMessage {
    /// Presence announcement; carries the extension name so both ends can
    /// tell they speak the same protocol.
    Handshake {
        /// Sender's peer id.
        peer_id: PeerId,
        /// Extension name the sender registered.
        extension: String,
    },
    /// "Send me transfer metadata for this object."
    Ask {
        /// The wanted object.
        id: ObjectId,
    },
    /// "Transfer metadata for your ask is ready."
    ReceivedTransfer {
        /// Where the pack is seeded.
        transfer: TransferId,
    },
    /// "Produce and seed packed data for this object."
    GeneratePack {
        /// The wanted object.
        id: ObjectId,
    },
    /// "Packed data is seeded."
    SendTransfer {
        /// Where the pack is seeded.
        transfer: TransferId,
    },
}

impl ExtensionMessage {
    /// Returns the type discriminator.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Handshake { .. } => MessageType::Handshake,
            Self::Ask { .. } => MessageType::Ask,
            Self::ReceivedTransfer { .. } => MessageType::ReceivedTransfer,
            Self::GeneratePack { .. } => MessageType::GeneratePack,
            Self::SendTransfer { .. } => MessageType::SendTransfer,
        }
    }

    /// Short name for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Handshake { .. } => "handshake",
            Self::Ask { .. } => "ask",
            Self::ReceivedTransfer { .. } => "receivedTransfer",
            Self::GeneratePack { .. } => "generatePack",
            Self::SendTransfer { .. } => "sendTransfer",
        }
    }

    /// Encodes the message to bytes.
    ///
    /// Extension names longer than 255 bytes are truncated.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u8(self.message_type() as u8);
        match self {
            Self::Handshake { peer_id, extension } => {
                buf.put_slice(peer_id.as_bytes());
                let name = extension.as_bytes();
                let len = name.len().min(usize::from(u8::MAX));
                #[allow(clippy::cast_possible_truncation)]
                buf.put_u8(len as u8);
                buf.put_slice(&name[..len]);
            }
            Self::Ask { id } | Self::GeneratePack { id } => buf.put_slice(id.as_bytes()),
            Self::ReceivedTransfer { transfer } | Self::SendTransfer { transfer } => {
                buf.put_slice(transfer.as_bytes());
            }
        }
        buf.freeze()
    }

    /// Decodes a message from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is truncated, has trailing bytes, or
    /// carries an unknown type.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let Some((&code, mut buf)) = data.split_first() else {
            return Err(ProtocolError::Malformed("empty message".into()));
        };
        let message = match MessageType::from_byte(code)? {
            MessageType::Handshake => {
                let peer_id = PeerId::from_bytes(take_20(&mut buf, "peer id")?);
                if !buf.has_remaining() {
                    return Err(ProtocolError::Malformed("truncated extension length".into()));
                }
                let len = usize::from(buf.get_u8());
                if buf.remaining() < len {
                    return Err(ProtocolError::Malformed("truncated extension name".into()));
                }
                let extension = String::from_utf8(buf[..len].to_vec())
                    .map_err(|e| ProtocolError::Malformed(format!("invalid extension name: {e}")))?;
                buf.advance(len);
                Self::Handshake { peer_id, extension }
            }
            MessageType::Ask => Self::Ask {
                id: ObjectId::from_bytes(take_20(&mut buf, "object id")?),
            },
            MessageType::GeneratePack => Self::GeneratePack {
                id: ObjectId::from_bytes(take_20(&mut buf, "object id")?),
            },
            MessageType::ReceivedTransfer => Self::ReceivedTransfer {
                transfer: TransferId::from_bytes(take_20(&mut buf, "transfer id")?),
            },
            MessageType::SendTransfer => Self::SendTransfer {
                transfer: TransferId::from_bytes(take_20(&mut buf, "transfer id")?),
            },
        };
        if buf.has_remaining() {
            return Err(ProtocolError::Malformed(format!(
                "{} trailing bytes after {}",
                buf.remaining(),
                message.kind()
            )));
        }
        Ok(message)
    }
}

fn take_20(buf: &mut &[u8], what: &str) -> Result<[u8; 20]> {
    if buf.remaining() < 20 {
        return Err(ProtocolError::Malformed(format!("truncated {what}")));
    }
    let mut out = [0u8; 20];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Writes one length-prefixed frame.
///
/// # Errors
///
/// Returns an error if the write fails.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &ExtensionMessage) -> Result<()> {
    let body = message.encode();
    #[allow(clippy::cast_possible_truncation)]
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame. Returns `None` on a clean end of stream.
///
/// # Errors
///
/// Returns an error if the frame is oversized, truncated or malformed.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<ExtensionMessage>> {
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::TooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    ExtensionMessage::decode(&body).map(Some)
}
