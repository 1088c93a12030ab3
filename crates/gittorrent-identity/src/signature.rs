//! Ed25519 signature, stored in the DHT as `r ‖ s`.

use std::fmt;

/// A 64-byte ed25519 signature: the 32-byte `r` followed by the 32-byte `s`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// The length of a signature in bytes.
    pub const LEN: usize = 64;

    /// Creates a signature from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Assembles a signature from its halves, each left-padded to 32 bytes.
    ///
    /// Returns `None` if either half is longer than 32 bytes.
    #[must_use]
    pub fn from_parts(r: &[u8], s: &[u8]) -> Option<Self> {
        let r: [u8; 32] = crate::zero_pad(r)?;
        let s: [u8; 32] = crate::zero_pad(s)?;
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&r);
        out[32..].copy_from_slice(&s);
        Some(Self(out))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// The `r` half.
    #[must_use]
    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    /// The `s` half.
    #[must_use]
    pub fn s(&self) -> &[u8] {
        &self.0[32..]
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
