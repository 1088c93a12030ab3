//! Signed mutable records, the form a directory takes in the DHT.

use crate::{DhtError, Result};
use gittorrent_identity::{zero_pad, Keypair, PublicKey, Signature};
use gittorrent_types::RecordKey;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Derives the DHT key for a publisher: SHA-1 of the 32-byte public key.
#[must_use]
pub fn record_key(public_key: &PublicKey) -> RecordKey {
    let digest = Sha1::digest(public_key.as_bytes());
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    RecordKey::from_bytes(out)
}

/// The bytes a mutable item signature covers: `3:seqi<seq>e1:v<len>:<value>`.
fn signable(seq: i64, value: &[u8]) -> Vec<u8> {
    let mut out = format!("3:seqi{seq}e1:v{}:", value.len()).into_bytes();
    out.extend_from_slice(value);
    out
}

/// A directory payload signed by its publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRecord {
    /// The publisher's key.
    pub public_key: PublicKey,
    /// Sequence number. gittorrent always publishes 0.
    pub seq: i64,
    /// The encoded directory.
    pub value: Vec<u8>,
    /// Signature over `seq` and `value`.
    pub signature: Signature,
}

impl SignedRecord {
    /// Signs `value` with `keypair`.
    #[must_use]
    pub fn sign(keypair: &Keypair, seq: i64, value: Vec<u8>) -> Self {
        let signature = keypair.sign(&signable(seq, &value));
        Self {
            public_key: keypair.public_key(),
            seq,
            value,
            signature,
        }
    }

    /// The key this record is stored under.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        record_key(&self.public_key)
    }

    /// Checks the signature.
    ///
    /// # Errors
    ///
    /// Returns [`DhtError::InvalidSignature`] if it does not verify.
    pub fn verify(&self) -> Result<()> {
        self.public_key
            .verify(&signable(self.seq, &self.value), &self.signature)
            .map_err(|_| DhtError::InvalidSignature)
    }
}

/// A mutable item as a DHT node returns it: unvalidated byte fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableItem {
    /// Public key bytes. Nodes may strip leading zeros.
    #[serde(with = "hex")]
    pub key: Vec<u8>,
    /// Sequence number.
    pub seq: i64,
    /// Stored value.
    #[serde(with = "hex")]
    pub value: Vec<u8>,
    /// Signature `r` half. Nodes may strip leading zeros.
    #[serde(with = "hex")]
    pub r: Vec<u8>,
    /// Signature `s` half. Nodes may strip leading zeros.
    #[serde(with = "hex")]
    pub s: Vec<u8>,
}

impl From<&SignedRecord> for MutableItem {
    fn from(record: &SignedRecord) -> Self {
        Self {
            key: record.public_key.as_bytes().to_vec(),
            seq: record.seq,
            value: record.value.clone(),
            r: record.signature.r().to_vec(),
            s: record.signature.s().to_vec(),
        }
    }
}

impl TryFrom<MutableItem> for SignedRecord {
    type Error = DhtError;

    /// Restores the fixed-width fields. Does not check the signature.
    fn try_from(item: MutableItem) -> Result<Self> {
        let key: [u8; 32] = zero_pad(&item.key)
            .ok_or_else(|| DhtError::Malformed(format!("public key is {} bytes", item.key.len())))?;
        let public_key =
            PublicKey::from_bytes(&key).map_err(|e| DhtError::Malformed(e.to_string()))?;

        let signature = Signature::from_parts(&item.r, &item.s).ok_or_else(|| {
            DhtError::Malformed(format!(
                "signature halves are {} and {} bytes",
                item.r.len(),
                item.s.len()
            ))
        })?;

        Ok(Self {
            public_key,
            seq: item.seq,
            value: item.value,
            signature,
        })
    }
}
