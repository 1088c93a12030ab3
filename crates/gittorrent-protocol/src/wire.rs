//! A peer connection carrying the extension.

use crate::message::{read_frame, write_frame};
use crate::{ExtensionHandler, ExtensionMessage, PeerId, ProtocolError, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

/// One peer connection with at most one registered extension handler.
pub struct Wire<S> {
    stream: S,
    local: PeerId,
    remote: Option<PeerId>,
    handler: Option<Box<dyn ExtensionHandler>>,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Wire<S> {
    /// Wraps an open transport.
    pub fn new(stream: S, local: PeerId) -> Self {
        Self {
            stream,
            local,
            remote: None,
            handler: None,
        }
    }

    /// Registers the extension handler.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler is already registered.
    pub fn register(&mut self, handler: Box<dyn ExtensionHandler>) -> Result<()> {
        if let Some(existing) = &self.handler {
            return Err(ProtocolError::AlreadyRegistered(existing.name().to_string()));
        }
        self.handler = Some(handler);
        Ok(())
    }

    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn send(&mut self, message: &ExtensionMessage) -> Result<()> {
        write_frame(&mut self.stream, message).await
    }

    /// Receives one message; `None` when the peer closed the connection.
    ///
    /// # Errors
    ///
    /// Returns an error on a broken or malformed frame.
    pub async fn recv(&mut self) -> Result<Option<ExtensionMessage>> {
        read_frame(&mut self.stream).await
    }

    /// Drives the connection until the handler finishes or the peer leaves.
    ///
    /// The initiator sends its handshake first; the acceptor answers the
    /// remote handshake with its own. A handshake naming another extension
    /// closes the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if no handler is registered, on I/O failure, or on an
    /// extension mismatch.
    pub async fn run(mut self, initiator: bool) -> Result<()> {
        let mut handler = self.handler.take().ok_or(ProtocolError::NoHandler)?;
        let name = handler.name().to_string();
        let our_handshake = ExtensionMessage::Handshake {
            peer_id: self.local,
            extension: name.clone(),
        };
        if initiator {
            self.send(&our_handshake).await?;
        }

        loop {
            let Some(message) = self.recv().await? else {
                debug!(extension = %name, "Peer closed the wire");
                return Ok(());
            };

            let outgoing = match message {
                ExtensionMessage::Handshake { peer_id, extension } => {
                    if extension != name {
                        warn!(expected = %name, offered = %extension, "Extension mismatch, closing wire");
                        return Err(ProtocolError::ExtensionMismatch {
                            expected: name,
                            offered: extension,
                        });
                    }
                    if self.remote.is_some() {
                        debug!(remote = %peer_id, "Ignoring repeated handshake");
                        continue;
                    }
                    self.remote = Some(peer_id);
                    if !initiator {
                        self.send(&our_handshake).await?;
                    }
                    handler.on_handshake(peer_id)?
                }
                other => {
                    let kind = other.kind();
                    match handler.on_message(other).await {
                        Ok(out) => out,
                        Err(e) => {
                            warn!(message = kind, error = %e, "Dropped extension message");
                            Vec::new()
                        }
                    }
                }
            };

            for message in outgoing {
                self.send(&message).await?;
                handler.on_sent(&message);
            }

            if handler.is_finished() {
                debug!(extension = %name, "Handler finished, closing wire");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        PackPipeline, PipelineError, ProviderHandler, RequesterHandler, EXTENSION_NAME,
    };
    use async_trait::async_trait;
    use gittorrent_types::{ObjectId, TransferId};
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct OnePack;

    #[async_trait]
    impl PackPipeline for OnePack {
        async fn generate(&self, id: &ObjectId) -> std::result::Result<PathBuf, PipelineError> {
            if *id == ObjectId::from_bytes([1; 20]) {
                Ok(PathBuf::from("one.pack"))
            } else {
                Err(PipelineError::UnknownObject(*id))
            }
        }

        async fn seed(&self, _path: &Path) -> std::result::Result<TransferId, PipelineError> {
            Ok(TransferId::from_bytes([7; 20]))
        }
    }

    #[tokio::test]
    async fn requester_and_provider_complete() {
        let (a, b) = tokio::io::duplex(4096);
        let peer = "127.0.0.1:6882".parse().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut requester = Wire::new(a, PeerId::generate());
        requester
            .register(Box::new(RequesterHandler::new(ObjectId::from_bytes([1; 20]), peer, tx)))
            .unwrap();
        let mut provider = Wire::new(b, PeerId::generate());
        provider
            .register(Box::new(ProviderHandler::new(Arc::new(OnePack), peer)))
            .unwrap();

        let (r, p) = tokio::join!(requester.run(true), provider.run(false));
        r.unwrap();
        p.unwrap();

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.transfer, TransferId::from_bytes([7; 20]));
        assert_eq!(notice.id, ObjectId::from_bytes([1; 20]));
    }

    #[tokio::test]
    async fn unknown_object_leaves_requester_waiting() {
        let (a, b) = tokio::io::duplex(4096);
        let peer = "127.0.0.1:6882".parse().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut requester = Wire::new(a, PeerId::generate());
        requester
            .register(Box::new(RequesterHandler::new(ObjectId::from_bytes([2; 20]), peer, tx)))
            .unwrap();
        let mut provider = Wire::new(b, PeerId::generate());
        provider
            .register(Box::new(ProviderHandler::new(Arc::new(OnePack), peer)))
            .unwrap();

        let requester_task = tokio::spawn(requester.run(true));
        let provider_task = tokio::spawn(provider.run(false));

        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert!(rx.try_recv().is_err());
        assert!(!requester_task.is_finished());

        requester_task.abort();
        // The provider sees the requester go away and exits cleanly.
        provider_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn mismatched_extension_closes() {
        let (a, mut b) = tokio::io::duplex(4096);
        let peer = "127.0.0.1:6882".parse().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut wire = Wire::new(a, PeerId::generate());
        wire.register(Box::new(RequesterHandler::new(ObjectId::from_bytes([1; 20]), peer, tx)))
            .unwrap();

        write_frame(
            &mut b,
            &ExtensionMessage::Handshake {
                peer_id: PeerId::generate(),
                extension: "ut_metadata".into(),
            },
        )
        .await
        .unwrap();

        let err = wire.run(true).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ExtensionMismatch { .. }));

        let first = read_frame(&mut b).await.unwrap().unwrap();
        assert!(matches!(first, ExtensionMessage::Handshake { extension, .. } if extension == EXTENSION_NAME));
    }

    #[tokio::test]
    async fn second_registration_fails() {
        let (a, _b) = tokio::io::duplex(64);
        let peer = "127.0.0.1:6882".parse().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut wire = Wire::new(a, PeerId::generate());
        wire.register(Box::new(RequesterHandler::new(ObjectId::from_bytes([1; 20]), peer, tx.clone())))
            .unwrap();
        let err = wire
            .register(Box::new(RequesterHandler::new(ObjectId::from_bytes([1; 20]), peer, tx)))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::AlreadyRegistered(name) if name == EXTENSION_NAME));
    }

    #[tokio::test]
    async fn run_without_handler_fails() {
        let (a, _b) = tokio::io::duplex(64);
        let wire = Wire::new(a, PeerId::generate());
        assert!(matches!(wire.run(true).await, Err(ProtocolError::NoHandler)));
    }
}
