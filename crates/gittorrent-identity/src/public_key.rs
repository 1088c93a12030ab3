//! Ed25519 public key, the identity a directory is published under.

use crate::{IdentityError, Result, Signature};
use ed25519_dalek::{Verifier, VerifyingKey};
use std::fmt;

/// A publisher's public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key: VerifyingKey,
}

impl PublicKey {
    /// The length of a public key in bytes.
    pub const LEN: usize = 32;

    pub(crate) fn from_verifying_key(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Parses a public key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid curve point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            IdentityError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&arr)
            .map_err(|e| IdentityError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.key.as_bytes()
    }

    /// First 8 bytes as hex, for log lines.
    #[must_use]
    pub fn short_id(&self) -> String {
        hex::encode(&self.as_bytes()[..8])
    }

    /// Verifies `signature` over `message`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidSignature`] if it does not verify.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
        self.key
            .verify(message, &sig)
            .map_err(|_| IdentityError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.short_id())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_bytes()))
    }
}
