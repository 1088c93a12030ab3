//! Requester role: ask a peer for one object and report the transfer id.

use crate::{ExtensionHandler, ExtensionMessage, PeerId, ProtocolError, Result, EXTENSION_NAME};
use async_trait::async_trait;
use gittorrent_types::{ObjectId, TransferId};
use std::fmt;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Where a requester connection is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequesterState {
    /// Transport open, no handshake yet.
    Connected,
    /// Both handshakes seen.
    HandshakeExchanged,
    /// `ask` queued for sending.
    AskSent,
    /// `ask` written; waiting for the provider.
    AwaitingTransfer,
    /// A transfer id arrived. Terminal.
    TransferReceived(TransferId),
}

impl fmt::Display for RequesterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::HandshakeExchanged => f.write_str("handshake exchanged"),
            Self::AskSent => f.write_str("ask sent"),
            Self::AwaitingTransfer => f.write_str("awaiting transfer"),
            Self::TransferReceived(_) => f.write_str("transfer received"),
        }
    }
}

/// Reported when a provider hands over a transfer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferNotice {
    /// The object that was asked for.
    pub id: ObjectId,
    /// Where its pack is seeded.
    pub transfer: TransferId,
    /// The provider that answered.
    pub peer: SocketAddr,
}

/// Asks one peer for one object id.
///
/// There is no retry: if the provider never answers, the handler stays in
/// [`RequesterState::AwaitingTransfer`].
pub struct RequesterHandler {
    id: ObjectId,
    peer: SocketAddr,
    state: RequesterState,
    notices: mpsc::UnboundedSender<TransferNotice>,
}

impl RequesterHandler {
    /// Creates a requester for `id` on the connection to `peer`.
    #[must_use]
    pub fn new(id: ObjectId, peer: SocketAddr, notices: mpsc::UnboundedSender<TransferNotice>) -> Self {
        Self {
            id,
            peer,
            state: RequesterState::Connected,
            notices,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RequesterState {
        self.state
    }

    fn transition(&mut self, next: RequesterState) {
        trace!(id = %self.id, peer = %self.peer, from = %self.state, to = %next, "Requester state");
        self.state = next;
    }

    fn unexpected(&self, message: &ExtensionMessage) -> ProtocolError {
        ProtocolError::UnexpectedMessage {
            state: self.state.to_string(),
            message: message.kind(),
        }
    }
}

#[async_trait]
impl ExtensionHandler for RequesterHandler {
    fn name(&self) -> &str {
        EXTENSION_NAME
    }

    fn on_handshake(&mut self, remote: PeerId) -> Result<Vec<ExtensionMessage>> {
        debug!(id = %self.id, peer = %self.peer, remote = %remote, "Handshake exchanged, asking");
        self.transition(RequesterState::HandshakeExchanged);
        let ask = ExtensionMessage::Ask { id: self.id };
        self.transition(RequesterState::AskSent);
        Ok(vec![ask])
    }

    async fn on_message(&mut self, message: ExtensionMessage) -> Result<Vec<ExtensionMessage>> {
        let transfer = match message {
            ExtensionMessage::ReceivedTransfer { transfer }
            | ExtensionMessage::SendTransfer { transfer } => transfer,
            other => return Err(self.unexpected(&other)),
        };
        match self.state {
            RequesterState::AskSent | RequesterState::AwaitingTransfer => {
                info!(id = %self.id, peer = %self.peer, transfer = %transfer, "Provider offered transfer");
                self.transition(RequesterState::TransferReceived(transfer));
                // A closed receiver means the fetch is over; nothing to report to.
                let _ = self.notices.send(TransferNotice {
                    id: self.id,
                    transfer,
                    peer: self.peer,
                });
                Ok(Vec::new())
            }
            RequesterState::TransferReceived(_) => {
                debug!(id = %self.id, transfer = %transfer, "Ignoring extra transfer offer");
                Ok(Vec::new())
            }
            RequesterState::Connected | RequesterState::HandshakeExchanged => Err(
                ProtocolError::UnexpectedMessage {
                    state: self.state.to_string(),
                    message: "transfer offer",
                },
            ),
        }
    }

    fn on_sent(&mut self, message: &ExtensionMessage) {
        if matches!(message, ExtensionMessage::Ask { .. }) && self.state == RequesterState::AskSent {
            self.transition(RequesterState::AwaitingTransfer);
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self.state, RequesterState::TransferReceived(_))
    }
}
