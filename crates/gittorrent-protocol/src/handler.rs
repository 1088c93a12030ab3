//! The seam between a wire and the role running on it.

use crate::{ExtensionMessage, PeerId, Result};
use async_trait::async_trait;

/// One side of the `ut_gittorrent` conversation.
///
/// The [`Wire`](crate::Wire) owns framing and the handshake exchange; the
/// handler sees the remote handshake once, then every other message, and
/// returns whatever it wants sent back.
#[async_trait]
pub trait ExtensionHandler: Send {
    /// Extension name put in our handshake.
    fn name(&self) -> &str;

    /// Called once the remote handshake has been accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot proceed with this peer.
    fn on_handshake(&mut self, remote: PeerId) -> Result<Vec<ExtensionMessage>>;

    /// Handles a non-handshake message.
    ///
    /// # Errors
    ///
    /// An error means the message was dropped; the wire logs it and goes on.
    async fn on_message(&mut self, message: ExtensionMessage) -> Result<Vec<ExtensionMessage>>;

    /// Called after `message` has been written to the peer.
    fn on_sent(&mut self, _message: &ExtensionMessage) {}

    /// Returns true once the handler has nothing more to do on this wire.
    fn is_finished(&self) -> bool;
}
