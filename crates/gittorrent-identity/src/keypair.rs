//! Ed25519 keypair used to sign published directories.

use crate::{IdentityError, PublicKey, Result, Signature};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// The node's long-term signing key.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh random keypair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuilds a keypair from its 32-byte secret seed.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not 32 bytes long.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret: Zeroizing<[u8; 32]> = Zeroizing::new(
            bytes
                .try_into()
                .map_err(|_| IdentityError::InvalidSecretKey)?,
        );
        Ok(Self {
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    /// Returns the public half.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Signs `message`.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::from_bytes(self.signing_key.sign(message).to_bytes())
    }

    /// Returns the secret seed. Zeroized on drop.
    #[must_use]
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn generated_keys_differ() {
        assert_ne!(Keypair::generate().public_key(), Keypair::generate().public_key());
    }

    #[test]
    fn sign_then_verify() {
        let kp = Keypair::generate();
        let signature = kp.sign(b"directory");
        assert!(kp.public_key().verify(b"directory", &signature).is_ok());
        assert!(kp.public_key().verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn secret_bytes_restore_same_key() {
        let kp = Keypair::generate();
        let restored = Keypair::from_secret_bytes(&*kp.secret_bytes()).unwrap();
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(matches!(
            Keypair::from_secret_bytes(&[7u8; 31]),
            Err(IdentityError::InvalidSecretKey)
        ));
    }
}
