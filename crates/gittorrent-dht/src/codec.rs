//! Byte encoding of the repository directory.

use crate::{DhtError, Result};
use gittorrent_types::RepositoryDirectory;

/// The largest value a DHT node will store.
pub const MAX_VALUE_SIZE: usize = 950;

/// Encodes a directory as compact JSON.
///
/// The encoding is deterministic because the directory uses sorted maps.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(directory: &RepositoryDirectory) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(directory)?)
}

/// Encodes a directory and checks it against [`MAX_VALUE_SIZE`].
///
/// # Errors
///
/// Returns [`DhtError::DirectoryTooLarge`] if the payload is over the ceiling.
pub fn encode_bounded(directory: &RepositoryDirectory) -> Result<Vec<u8>> {
    let payload = encode(directory)?;
    if payload.len() > MAX_VALUE_SIZE {
        return Err(DhtError::DirectoryTooLarge {
            size: payload.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(payload)
}

/// Decodes a directory payload.
///
/// # Errors
///
/// Returns [`DhtError::Malformed`] if the bytes are not a directory.
pub fn decode(payload: &[u8]) -> Result<RepositoryDirectory> {
    serde_json::from_slice(payload).map_err(|e| DhtError::Malformed(e.to_string()))
}
