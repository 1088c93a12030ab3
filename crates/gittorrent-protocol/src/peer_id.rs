//! Peer identifiers exchanged in the handshake.

use std::fmt;

/// A 20-byte peer id: `-GT` + 4-digit version + `-` + 12 random hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 20]);

impl PeerId {
    /// The length in bytes.
    pub const LEN: usize = 20;

    /// Generates a fresh id for this client version.
    #[must_use]
    pub fn generate() -> Self {
        let random: [u8; 6] = rand::random();
        let text = format!(
            "-GT{:0>2}{:0>2}-{}",
            env!("CARGO_PKG_VERSION_MAJOR"),
            env!("CARGO_PKG_VERSION_MINOR"),
            random.iter().map(|b| format!("{b:02x}")).collect::<String>()
        );
        let mut bytes = [0u8; 20];
        let len = text.len().min(Self::LEN);
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self(bytes)
    }

    /// Wraps raw bytes received from a peer.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_layout() {
        let id = PeerId::generate().to_string();
        assert_eq!(id.len(), 20);
        assert!(id.starts_with("-GT"));
        assert_eq!(&id[7..8], "-");
        assert!(id[3..7].chars().all(|c| c.is_ascii_digit()));
        assert!(id[8..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(PeerId::generate(), PeerId::generate());
    }
}
