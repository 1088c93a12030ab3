//! Signed publisher: directory in, DHT record out.

use crate::{codec, Dht, Result, SignedRecord};
use gittorrent_identity::Keypair;
use gittorrent_types::{RecordKey, RepositoryDirectory};
use tracing::info;

/// Sequence number of every published record.
///
/// Records are overwritten unconditionally, so the sequence never advances.
pub const SEQUENCE: i64 = 0;

/// Encodes, signs and stores `directory` under the key of `keypair`.
///
/// # Errors
///
/// Returns [`DhtError::DirectoryTooLarge`](crate::DhtError::DirectoryTooLarge)
/// before touching the DHT if the encoded directory exceeds
/// [`MAX_VALUE_SIZE`](crate::MAX_VALUE_SIZE); otherwise any error from `put`.
pub async fn publish(
    dht: &dyn Dht,
    directory: &RepositoryDirectory,
    keypair: &Keypair,
) -> Result<RecordKey> {
    let payload = codec::encode_bounded(directory)?;
    let size = payload.len();
    let record = SignedRecord::sign(keypair, SEQUENCE, payload);
    let key = dht.put(&record).await?;
    info!(
        key = %key,
        repositories = directory.repositories.len(),
        bytes = size,
        "Published repository directory"
    );
    Ok(key)
}
