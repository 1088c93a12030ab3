//! Identifier types for gittorrent.

use crate::{Result, TypesError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Declares a 20-byte identifier that is written as 40 lowercase hex characters.
macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 20]);

        impl $name {
            /// The length of the identifier in bytes.
            pub const LEN: usize = 20;

            /// The length of the identifier in hex characters.
            pub const HEX_LEN: usize = 40;

            /// Creates an identifier from raw bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 20]) -> Self {
                Self(bytes)
            }

            /// Returns the raw bytes of this identifier.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 20] {
                &self.0
            }

            /// Parses an identifier from exactly 40 hex characters.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is not 40 hex characters.
            pub fn from_hex(s: &str) -> Result<Self> {
                if s.len() != Self::HEX_LEN {
                    return Err(TypesError::InvalidId {
                        kind: $kind,
                        reason: format!("expected {} hex characters, got {}", Self::HEX_LEN, s.len()),
                    });
                }
                let mut bytes = [0u8; 20];
                hex::decode_to_slice(s, &mut bytes).map_err(|e| TypesError::InvalidId {
                    kind: $kind,
                    reason: e.to_string(),
                })?;
                Ok(Self(bytes))
            }

            /// Creates an identifier from a byte slice.
            ///
            /// # Errors
            ///
            /// Returns an error if the slice is not exactly 20 bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self> {
                let arr: [u8; 20] = bytes.try_into().map_err(|_| TypesError::InvalidId {
                    kind: $kind,
                    reason: format!("expected {} bytes, got {}", Self::LEN, bytes.len()),
                })?;
                Ok(Self(arr))
            }

            /// Returns the identifier as lowercase hex.
            #[must_use]
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Returns the first 8 hex characters, for log lines.
            #[must_use]
            pub fn short(&self) -> String {
                hex::encode(&self.0[..4])
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.short())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_id!(
    /// A git object id (SHA-1), also used verbatim as the swarm identifier
    /// under which peers holding the object announce themselves.
    ObjectId,
    "object id"
);

hex_id!(
    /// The identifier the transfer engine assigns to a seeded file.
    TransferId,
    "transfer id"
);

hex_id!(
    /// The DHT key a signed directory is stored under: the SHA-1 of the
    /// publisher's 32-byte public key. This is the key carried in discovery URLs.
    RecordKey,
    "record key"
);

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";

    #[test]
    fn object_id_hex_roundtrip() {
        let id = ObjectId::from_hex(MASTER).unwrap();
        assert_eq!(id.to_hex(), MASTER);
        assert_eq!(id.to_string(), MASTER);
        assert_eq!(id.short(), "a94a8fe5");
    }

    #[test]
    fn object_id_uppercase_normalizes() {
        let id = ObjectId::from_hex(&MASTER.to_uppercase()).unwrap();
        assert_eq!(id.to_hex(), MASTER);
    }

    #[test]
    fn object_id_rejects_bad_input() {
        assert!(ObjectId::from_hex("abc").is_err());
        assert!(ObjectId::from_hex(&"z".repeat(40)).is_err());
        assert!(ObjectId::from_slice(&[0u8; 19]).is_err());
    }

    #[test]
    fn object_id_serde_as_hex_string() {
        let id: ObjectId = MASTER.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{MASTER}\""));
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn transfer_id_debug_is_short() {
        let id = TransferId::from_bytes([0xab; 20]);
        assert_eq!(format!("{id:?}"), "TransferId(abababab)");
    }
}
