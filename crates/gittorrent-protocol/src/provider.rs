//! Provider role: turn a request for an object into a seeded pack.

use crate::{ExtensionHandler, ExtensionMessage, PeerId, PipelineError, ProtocolError, Result, EXTENSION_NAME};
use async_trait::async_trait;
use gittorrent_types::{ObjectId, TransferId};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Produces and seeds packs on behalf of a provider connection.
#[async_trait]
pub trait PackPipeline: Send + Sync {
    /// Writes a pack containing `id` and what it reaches, returning its path.
    ///
    /// Fails with [`PipelineError::UnknownObject`] if `id` is not announced.
    async fn generate(&self, id: &ObjectId) -> std::result::Result<PathBuf, PipelineError>;

    /// Hands a written pack to the transfer engine.
    async fn seed(&self, path: &Path) -> std::result::Result<TransferId, PipelineError>;
}

/// Where a provider connection is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    /// Transport open, no handshake yet.
    Connected,
    /// Both handshakes seen.
    HandshakeExchanged,
    /// Ready for `ask` / `generatePack`.
    AwaitingRequest,
    /// Pack generation running for the object.
    PackGenerating(ObjectId),
    /// Pack written; being seeded.
    Seeding(ObjectId),
    /// Transfer id sent. Terminal.
    Replied,
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::HandshakeExchanged => f.write_str("handshake exchanged"),
            Self::AwaitingRequest => f.write_str("awaiting request"),
            Self::PackGenerating(id) => write!(f, "generating pack for {}", id.short()),
            Self::Seeding(id) => write!(f, "seeding pack for {}", id.short()),
            Self::Replied => f.write_str("replied"),
        }
    }
}

/// Serves one inbound connection.
///
/// Answers `ask` with `receivedTransfer` and `generatePack` with
/// `sendTransfer`. Unknown objects and pipeline failures are logged and left
/// unanswered.
pub struct ProviderHandler {
    pipeline: Arc<dyn PackPipeline>,
    peer: SocketAddr,
    state: ProviderState,
}

impl ProviderHandler {
    /// Creates a provider for the connection from `peer`.
    #[must_use]
    pub fn new(pipeline: Arc<dyn PackPipeline>, peer: SocketAddr) -> Self {
        Self {
            pipeline,
            peer,
            state: ProviderState::Connected,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ProviderState {
        self.state
    }

    fn transition(&mut self, next: ProviderState) {
        trace!(peer = %self.peer, from = %self.state, to = %next, "Provider state");
        self.state = next;
    }

    async fn serve(&mut self, id: ObjectId) -> Option<TransferId> {
        self.transition(ProviderState::PackGenerating(id));
        let path = match self.pipeline.generate(&id).await {
            Ok(path) => path,
            Err(PipelineError::UnknownObject(_)) => {
                warn!(id = %id, peer = %self.peer, "Rejected request for unannounced object");
                self.transition(ProviderState::AwaitingRequest);
                return None;
            }
            Err(e) => {
                warn!(id = %id, peer = %self.peer, error = %e, "Pack generation failed");
                self.transition(ProviderState::AwaitingRequest);
                return None;
            }
        };

        self.transition(ProviderState::Seeding(id));
        match self.pipeline.seed(&path).await {
            Ok(transfer) => {
                info!(id = %id, peer = %self.peer, transfer = %transfer, "Seeding pack");
                Some(transfer)
            }
            Err(e) => {
                warn!(id = %id, path = %path.display(), error = %e, "Seeding failed");
                self.transition(ProviderState::AwaitingRequest);
                None
            }
        }
    }
}

#[async_trait]
impl ExtensionHandler for ProviderHandler {
    fn name(&self) -> &str {
        EXTENSION_NAME
    }

    fn on_handshake(&mut self, remote: PeerId) -> Result<Vec<ExtensionMessage>> {
        debug!(peer = %self.peer, remote = %remote, "Handshake exchanged");
        self.transition(ProviderState::HandshakeExchanged);
        self.transition(ProviderState::AwaitingRequest);
        Ok(Vec::new())
    }

    async fn on_message(&mut self, message: ExtensionMessage) -> Result<Vec<ExtensionMessage>> {
        if self.state != ProviderState::AwaitingRequest {
            return Err(ProtocolError::UnexpectedMessage {
                state: self.state.to_string(),
                message: message.kind(),
            });
        }
        let reply = match message {
            ExtensionMessage::Ask { id } => self
                .serve(id)
                .await
                .map(|transfer| ExtensionMessage::ReceivedTransfer { transfer }),
            ExtensionMessage::GeneratePack { id } => self
                .serve(id)
                .await
                .map(|transfer| ExtensionMessage::SendTransfer { transfer }),
            other => {
                return Err(ProtocolError::UnexpectedMessage {
                    state: self.state.to_string(),
                    message: other.kind(),
                })
            }
        };
        Ok(reply.into_iter().collect())
    }

    fn on_sent(&mut self, message: &ExtensionMessage) {
        if matches!(
            message,
            ExtensionMessage::ReceivedTransfer { .. } | ExtensionMessage::SendTransfer { .. }
        ) {
            self.transition(ProviderState::Replied);
        }
    }

    fn is_finished(&self) -> bool {
        self.state == ProviderState::Replied
    }
}
