//! # gittorrent Identity
//!
//! The long-term ed25519 key a node signs its repository directory with,
//! and the key file it is kept in between runs.
//!
//! ## Example
//!
//! ```rust
//! use gittorrent_identity::Keypair;
//!
//! let keypair = Keypair::generate();
//! let payload = br#"{"repositories":{}}"#;
//! let signature = keypair.sign(payload);
//!
//! assert!(keypair.public_key().verify(payload, &signature).is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod keyfile;
mod keypair;
mod public_key;
mod signature;

pub use error::{IdentityError, Result};
pub use keyfile::{load_or_create, KeyFile};
pub use keypair::Keypair;
pub use public_key::PublicKey;
pub use signature::Signature;

/// Left-pads `bytes` with zeros to exactly `N` bytes.
///
/// Returns `None` when the input is longer than `N`. DHT nodes may strip
/// leading zero bytes from keys and signature halves, so shorter inputs are
/// accepted.
#[must_use]
pub fn zero_pad<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    if bytes.len() > N {
        return None;
    }
    let mut out = [0u8; N];
    out[N - bytes.len()..].copy_from_slice(bytes);
    Some(out)
}
