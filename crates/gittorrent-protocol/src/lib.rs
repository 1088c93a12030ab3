//! # gittorrent Protocol
//!
//! The `ut_gittorrent` extension spoken over peer wires.
//!
//! ## Message flow
//!
//! ```text
//! requester                      provider
//!     | ---- handshake ------------> |
//!     | <--- handshake ------------- |
//!     | ---- ask(object id) -------> |   pack generated and seeded
//!     | <--- receivedTransfer(tid) - |
//! ```
//!
//! `generatePack` / `sendTransfer` follow the same pattern. Each role is an
//! [`ExtensionHandler`] registered on a [`Wire`], which owns framing and the
//! handshake.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod handler;
pub mod message;
mod peer_id;
mod provider;
mod requester;
mod transport;
mod wire;

pub use error::{PipelineError, ProtocolError, Result};
pub use handler::ExtensionHandler;
pub use message::{ExtensionMessage, MessageType, EXTENSION_NAME, MAX_FRAME_SIZE};
pub use peer_id::PeerId;
pub use provider::{PackPipeline, ProviderHandler, ProviderState};
pub use requester::{RequesterHandler, RequesterState, TransferNotice};
pub use transport::{
    BoxedTransport, Connector, MemoryListener, MemoryNetwork, TcpConnector, Transport,
};
pub use wire::Wire;
