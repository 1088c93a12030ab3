//! Publish/resolve scenarios against the in-memory DHT.

use gittorrent_dht::{publish, record_key, resolve, DhtError, MemoryDht, MutableItem, SignedRecord, MAX_VALUE_SIZE};
use gittorrent_identity::Keypair;
use gittorrent_types::{ObjectId, RepositoryDirectory};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[tokio::test]
async fn published_directory_resolves_by_key() {
    let dht = MemoryDht::new();
    let keypair = Keypair::generate();
    let master: ObjectId = "a".repeat(40).parse().unwrap();

    let mut directory = RepositoryDirectory::new();
    directory.insert("lib", "refs/heads/master", master);

    let key = publish(&dht, &directory, &keypair).await.unwrap();
    assert_eq!(key, record_key(&keypair.public_key()));

    let resolved = resolve(&dht, &key.to_hex()).await.unwrap();
    assert_eq!(resolved, directory);
    assert_eq!(resolved.refs_for("lib").get("refs/heads/master"), Some(&master));
}

#[tokio::test]
async fn republishing_overwrites() {
    let dht = MemoryDht::new();
    let keypair = Keypair::generate();

    let mut first = RepositoryDirectory::new();
    first.insert("lib", "HEAD", ObjectId::from_bytes([1; 20]));
    publish(&dht, &first, &keypair).await.unwrap();

    let mut second = RepositoryDirectory::new();
    second.insert("lib", "HEAD", ObjectId::from_bytes([2; 20]));
    let key = publish(&dht, &second, &keypair).await.unwrap();

    assert_eq!(resolve(&dht, &key.to_hex()).await.unwrap(), second);
    assert_eq!(dht.put_count(), 2);
}

#[tokio::test]
async fn too_large_directory_never_reaches_the_dht() {
    let dht = MemoryDht::new();
    let mut directory = RepositoryDirectory::new();
    for n in 0..20 {
        directory.insert("big", format!("refs/heads/branch-{n}"), ObjectId::from_bytes([n; 20]));
    }

    let err = publish(&dht, &directory, &Keypair::generate()).await.unwrap_err();
    match err {
        DhtError::DirectoryTooLarge { size, max } => {
            assert!(size > MAX_VALUE_SIZE);
            assert_eq!(max, MAX_VALUE_SIZE);
        }
        other => panic!("expected DirectoryTooLarge, got {other:?}"),
    }
    assert_eq!(dht.put_count(), 0);
}

#[tokio::test]
async fn unknown_key_is_not_found() {
    let dht = MemoryDht::new();
    let err = resolve(&dht, &"0".repeat(40)).await.unwrap_err();
    assert!(matches!(err, DhtError::NotFound(_)));
}

#[tokio::test]
async fn bad_key_is_malformed() {
    let dht = MemoryDht::new();
    assert!(matches!(resolve(&dht, "xyz").await, Err(DhtError::Malformed(_))));
}

#[tokio::test]
async fn undecodable_value_is_malformed() {
    let dht = MemoryDht::new();
    let keypair = Keypair::generate();
    let record = SignedRecord::sign(&keypair, 0, b"not a directory".to_vec());
    dht.insert_raw(record.key(), MutableItem::from(&record));

    let err = resolve(&dht, &record.key().to_hex()).await.unwrap_err();
    assert!(matches!(err, DhtError::Malformed(_)));
}

#[tokio::test]
async fn oversized_key_is_malformed() {
    let dht = MemoryDht::new();
    let record = SignedRecord::sign(&Keypair::generate(), 0, b"{\"repositories\":{}}".to_vec());
    let mut item = MutableItem::from(&record);
    item.key = vec![0xff; 33];
    dht.insert_raw(record.key(), item);

    let err = resolve(&dht, &record.key().to_hex()).await.unwrap_err();
    assert!(matches!(err, DhtError::Malformed(_)));
}

fn arb_directory() -> impl Strategy<Value = RepositoryDirectory> {
    prop::collection::btree_map(
        "[a-z][a-z0-9-]{0,10}",
        prop::collection::btree_map("(HEAD|refs/heads/[a-z]{1,8})", any::<[u8; 20]>(), 0..4),
        0..4,
    )
    .prop_map(|repos| {
        let mut dir = RepositoryDirectory::new();
        for (name, refs) in repos {
            dir.add_repository(name.clone());
            for (r, bytes) in refs {
                dir.insert(name.clone(), r, ObjectId::from_bytes(bytes));
            }
        }
        dir
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn resolve_inverts_publish_within_ceiling(directory in arb_directory()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let dht = MemoryDht::new();
        let keypair = Keypair::generate();
        let size = gittorrent_dht::codec::encode(&directory).unwrap().len();

        let outcome = runtime.block_on(async {
            match publish(&dht, &directory, &keypair).await {
                Ok(key) => Some(resolve(&dht, &key.to_hex()).await.unwrap()),
                Err(DhtError::DirectoryTooLarge { .. }) => None,
                Err(e) => panic!("unexpected error: {e}"),
            }
        });

        if size <= MAX_VALUE_SIZE {
            prop_assert_eq!(outcome, Some(directory));
        } else {
            prop_assert_eq!(outcome, None);
            prop_assert_eq!(dht.put_count(), 0);
        }
    }
}
