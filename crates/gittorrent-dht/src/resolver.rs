//! Directory resolver: DHT key in, repository directory out.

use crate::{codec, Dht, DhtError, Result, SignedRecord};
use gittorrent_types::{RecordKey, RepositoryDirectory};
use tracing::debug;

/// Fetches and decodes the directory published under `key_hex`.
///
/// The signature is not checked here: the key itself is the publisher's
/// identity, and storing nodes verify on `put`.
///
/// # Errors
///
/// - [`DhtError::Malformed`] if the key is not 40 hex characters, or the
///   stored item does not decode.
/// - [`DhtError::NotFound`] if nothing is stored under the key.
pub async fn resolve(dht: &dyn Dht, key_hex: &str) -> Result<RepositoryDirectory> {
    let key = RecordKey::from_hex(key_hex).map_err(|e| DhtError::Malformed(e.to_string()))?;
    let item = dht.get(&key).await?.ok_or(DhtError::NotFound(key))?;
    let record = SignedRecord::try_from(item)?;
    let directory = codec::decode(&record.value)?;
    debug!(key = %key, repositories = directory.repositories.len(), "Resolved directory");
    Ok(directory)
}
