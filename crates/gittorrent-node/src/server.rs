//! Accepting peer wires and serving them as a provider.

use gittorrent_protocol::{MemoryListener, PackPipeline, PeerId, ProviderHandler, Result, Wire};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Serves one inbound connection until the requester is answered or leaves.
///
/// # Errors
///
/// Returns an error on I/O failure or an extension mismatch.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    pipeline: Arc<dyn PackPipeline>,
    local: PeerId,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut wire = Wire::new(stream, local);
    wire.register(Box::new(ProviderHandler::new(pipeline, peer)))?;
    wire.run(false).await
}

fn spawn_connection<S>(stream: S, peer: SocketAddr, pipeline: Arc<dyn PackPipeline>, local: PeerId)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        debug!(peer = %peer, "Accepted connection");
        match handle_connection(stream, peer, pipeline, local).await {
            Ok(()) => debug!(peer = %peer, "Connection closed"),
            Err(e) => warn!(peer = %peer, error = %e, "Connection failed"),
        }
    });
}

/// Accepts TCP connections forever, one task per connection.
///
/// # Errors
///
/// Returns an error if accepting fails.
pub async fn serve(listener: TcpListener, pipeline: Arc<dyn PackPipeline>, local: PeerId) -> io::Result<()> {
    info!(addr = %listener.local_addr()?, peer_id = %local, "Listening for peers");
    loop {
        let (stream, peer) = listener.accept().await?;
        spawn_connection(stream, peer, Arc::clone(&pipeline), local);
    }
}

/// Like [`serve`] over an in-process network; returns when the network goes away.
pub async fn serve_memory(mut listener: MemoryListener, pipeline: Arc<dyn PackPipeline>, local: PeerId) {
    debug!(addr = %listener.local_addr(), "Listening on memory network");
    while let Some((stream, peer)) = listener.accept().await {
        spawn_connection(stream, peer, Arc::clone(&pipeline), local);
    }
}
