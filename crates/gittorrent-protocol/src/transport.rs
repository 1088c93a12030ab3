//! Byte streams a wire can run over, and ways to open them.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// A bidirectional byte stream.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}

/// A type-erased transport.
pub type BoxedTransport = Box<dyn Transport>;

/// Opens outbound connections to peers.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `addr`.
    async fn connect(&self, addr: SocketAddr) -> io::Result<BoxedTransport>;
}

/// Plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: SocketAddr) -> io::Result<BoxedTransport> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

const DUPLEX_BUFFER: usize = 64 * 1024;

#[derive(Default)]
struct Listeners {
    bound: HashMap<SocketAddr, mpsc::UnboundedSender<(DuplexStream, SocketAddr)>>,
    dials: HashMap<SocketAddr, usize>,
    next_port: u16,
}

/// An in-process network of duplex pipes addressed by socket address.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    listeners: Arc<Mutex<Listeners>>,
}

/// Accepts connections made to a bound [`MemoryNetwork`] address.
pub struct MemoryListener {
    addr: SocketAddr,
    incoming: mpsc::UnboundedReceiver<(DuplexStream, SocketAddr)>,
}

impl MemoryNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts listening on `addr`, replacing any previous listener there.
    #[must_use]
    pub fn bind(&self, addr: SocketAddr) -> MemoryListener {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().bound.insert(addr, tx);
        MemoryListener { addr, incoming: rx }
    }

    /// Number of connections ever made to `addr`.
    #[must_use]
    pub fn dial_count(&self, addr: &SocketAddr) -> usize {
        self.listeners.lock().dials.get(addr).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Connector for MemoryNetwork {
    async fn connect(&self, addr: SocketAddr) -> io::Result<BoxedTransport> {
        let mut listeners = self.listeners.lock();
        *listeners.dials.entry(addr).or_default() += 1;
        listeners.next_port = listeners.next_port.wrapping_add(1);
        let from = SocketAddr::from(([127, 0, 0, 1], 40_000u16.wrapping_add(listeners.next_port)));
        let tx = listeners
            .bound
            .get(&addr)
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, format!("nothing bound at {addr}")))?;
        let (client, server) = tokio::io::duplex(DUPLEX_BUFFER);
        tx.send((server, from))
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, format!("listener at {addr} closed")))?;
        Ok(Box::new(client))
    }
}

impl MemoryListener {
    /// The bound address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for the next connection. `None` once the network is dropped.
    pub async fn accept(&mut self) -> Option<(DuplexStream, SocketAddr)> {
        self.incoming.recv().await
    }
}
