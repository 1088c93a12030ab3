//! Server role over the in-process network. Tests that need git return early
//! when it is missing.

use async_trait::async_trait;
use gittorrent_dht::{record_key, resolve, Dht, DhtEvent, MemoryDht, MutableItem, SignedRecord};
use gittorrent_git::{Git, IndexPack, PackIngest, EXPORT_OK};
use gittorrent_identity::Keypair;
use gittorrent_node::{serve_memory, GitPackPipeline, IndexHandle, Publisher};
use gittorrent_protocol::{ExtensionMessage, MemoryNetwork, PackPipeline, PeerId, Wire, EXTENSION_NAME};
use gittorrent_swarm::{MemorySwarm, TransferEngine};
use gittorrent_types::{ObjectId, RecordKey};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const PROVIDER: &str = "10.0.0.1:6882";

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

fn run(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "gittorrent")
        .env("GIT_AUTHOR_EMAIL", "gittorrent@example.com")
        .env("GIT_COMMITTER_NAME", "gittorrent")
        .env("GIT_COMMITTER_EMAIL", "gittorrent@example.com")
        .output()
        .unwrap();
    assert!(output.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap()
}

/// Creates an exported repository `<root>/<name>` with one commit on master.
fn exported_repo(root: &Path, name: &str) -> ObjectId {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    run(&dir, &["init", "-q"]);
    run(&dir, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    std::fs::write(dir.join("README"), name).unwrap();
    run(&dir, &["add", "README"]);
    run(&dir, &["commit", "-q", "-m", "initial"]);
    std::fs::write(dir.join(".git").join(EXPORT_OK), "").unwrap();
    run(&dir, &["rev-parse", "HEAD"]).trim().parse().unwrap()
}

/// Notes, for every announcement, whether the index already held the id.
struct IndexCheckingDht {
    inner: MemoryDht,
    index: IndexHandle,
    announced: Mutex<Vec<(ObjectId, bool)>>,
}

#[async_trait]
impl Dht for IndexCheckingDht {
    async fn ready(&self) -> gittorrent_dht::Result<()> {
        self.inner.ready().await
    }

    async fn announce(&self, id: &ObjectId, port: u16) -> gittorrent_dht::Result<()> {
        let servable = self.index.current().contains(id);
        self.announced.lock().push((*id, servable));
        self.inner.announce(id, port).await
    }

    async fn lookup(&self, id: &ObjectId) -> gittorrent_dht::Result<()> {
        self.inner.lookup(id).await
    }

    async fn get(&self, key: &RecordKey) -> gittorrent_dht::Result<Option<MutableItem>> {
        self.inner.get(key).await
    }

    async fn put(&self, record: &SignedRecord) -> gittorrent_dht::Result<RecordKey> {
        self.inner.put(record).await
    }

    fn subscribe(&self) -> broadcast::Receiver<DhtEvent> {
        self.inner.subscribe()
    }
}

async fn connect(network: &MemoryNetwork) -> Wire<gittorrent_protocol::BoxedTransport> {
    use gittorrent_protocol::Connector;
    let addr: SocketAddr = PROVIDER.parse().unwrap();
    let stream = network.connect(addr).await.unwrap();
    let mut wire = Wire::new(stream, PeerId::generate());
    wire.send(&ExtensionMessage::Handshake {
        peer_id: PeerId::generate(),
        extension: EXTENSION_NAME.to_string(),
    })
    .await
    .unwrap();
    let reply = wire.recv().await.unwrap().unwrap();
    assert!(matches!(reply, ExtensionMessage::Handshake { .. }));
    wire
}

fn start_server(network: &MemoryNetwork, pipeline: GitPackPipeline) {
    let listener = network.bind(PROVIDER.parse().unwrap());
    let pipeline: Arc<dyn PackPipeline> = Arc::new(pipeline);
    tokio::spawn(serve_memory(listener, pipeline, PeerId::generate()));
}

#[tokio::test]
async fn generate_pack_for_unannounced_object_gets_no_reply() {
    let work = tempfile::tempdir().unwrap();
    let network = MemoryNetwork::new();
    start_server(
        &network,
        GitPackPipeline::new(IndexHandle::new(), Git::default(), work.path(), Arc::new(MemorySwarm::new())),
    );

    let mut wire = connect(&network).await;
    let id = ObjectId::from_bytes([9; 20]);
    wire.send(&ExtensionMessage::GeneratePack { id }).await.unwrap();

    let reply = tokio::time::timeout(Duration::from_millis(200), wire.recv()).await;
    assert!(reply.is_err(), "expected silence, got {reply:?}");
    assert!(!work.path().join(format!("{id}.pack")).exists());
}

#[tokio::test]
async fn publish_then_serve_pack() {
    if !git_available() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let head = exported_repo(root.path(), "lib");
    std::fs::create_dir(root.path().join("not-exported")).unwrap();

    let dht = MemoryDht::new();
    let swarm = MemorySwarm::new();
    let keypair = Keypair::generate();
    let key = record_key(&keypair.public_key());
    let index = IndexHandle::new();

    let mut publisher = Publisher::new(Arc::new(dht.clone()), keypair, Git::default(), root.path(), 6882, index.clone());
    let report = publisher.run_cycle().await.unwrap();
    assert_eq!(report.repositories, 1);
    assert_eq!(report.refs, 2);
    assert_eq!(report.newly_announced, 1);
    assert_eq!(report.published, Some(key));
    assert_eq!(dht.peers(&head), vec!["127.0.0.1:6882".parse::<SocketAddr>().unwrap()]);

    let directory = resolve(&dht, &key.to_hex()).await.unwrap();
    let refs = directory.refs_for("lib");
    assert_eq!(refs.get("refs/heads/master"), Some(&head));
    assert_eq!(refs.get("HEAD"), Some(&head));
    assert!(directory.repository("not-exported").is_none());

    // Second cycle announces nothing new.
    let again = publisher.run_cycle().await.unwrap();
    assert_eq!(again.newly_announced, 0);

    let network = MemoryNetwork::new();
    start_server(
        &network,
        GitPackPipeline::new(index, Git::default(), work.path(), Arc::new(swarm.clone())),
    );

    let mut wire = connect(&network).await;
    wire.send(&ExtensionMessage::Ask { id: head }).await.unwrap();
    let Some(ExtensionMessage::ReceivedTransfer { transfer }) = wire.recv().await.unwrap() else {
        panic!("expected receivedTransfer");
    };
    assert!(work.path().join(format!("{head}.pack")).is_file());

    let downloads = tempfile::tempdir().unwrap();
    let file = swarm.download(&transfer, downloads.path()).await.unwrap();
    assert_eq!(file.name, format!("{head}.pack"));

    let clone = tempfile::tempdir().unwrap();
    run(clone.path(), &["init", "-q", "--bare"]);
    let outcome = IndexPack::new(Git::default())
        .in_dir(clone.path())
        .ingest(&file.path)
        .await
        .unwrap();
    assert!(outcome.success());
    assert_eq!(run(clone.path(), &["cat-file", "-t", &head.to_hex()]).trim(), "commit");
}

#[tokio::test]
async fn objects_are_servable_when_announced() {
    if !git_available() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let alpha = exported_repo(root.path(), "alpha");
    let beta = exported_repo(root.path(), "beta");

    let index = IndexHandle::new();
    let dht = Arc::new(IndexCheckingDht {
        inner: MemoryDht::new(),
        index: index.clone(),
        announced: Mutex::new(Vec::new()),
    });
    let mut publisher = Publisher::new(
        Arc::clone(&dht) as Arc<dyn Dht>,
        Keypair::generate(),
        Git::default(),
        root.path(),
        6882,
        index,
    );
    let report = publisher.run_cycle().await.unwrap();
    assert_eq!(report.newly_announced, 2);

    let announced = dht.announced.lock().clone();
    assert_eq!(announced.len(), 2);
    assert!(announced.contains(&(alpha, true)));
    assert!(announced.contains(&(beta, true)));
}

#[tokio::test]
async fn concurrent_requests_for_one_object_leave_a_complete_pack() {
    if !git_available() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let head = exported_repo(root.path(), "lib");

    let index = IndexHandle::new();
    let mut publisher = Publisher::new(
        Arc::new(MemoryDht::new()),
        Keypair::generate(),
        Git::default(),
        root.path(),
        6882,
        index.clone(),
    );
    publisher.run_cycle().await.unwrap();

    let pipeline = GitPackPipeline::new(index, Git::default(), work.path(), Arc::new(MemorySwarm::new()));
    let (a, b, c, d) = tokio::join!(
        pipeline.generate(&head),
        pipeline.generate(&head),
        pipeline.generate(&head),
        pipeline.generate(&head),
    );
    for path in [a, b, c, d] {
        assert_eq!(path.unwrap(), pipeline.pack_path(&head));
    }

    let entries: Vec<_> = std::fs::read_dir(work.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from(format!("{head}.pack"))]);

    let clone = tempfile::tempdir().unwrap();
    run(clone.path(), &["init", "-q", "--bare"]);
    let outcome = IndexPack::new(Git::default())
        .in_dir(clone.path())
        .ingest(&pipeline.pack_path(&head))
        .await
        .unwrap();
    assert!(outcome.success());
    assert_eq!(run(clone.path(), &["cat-file", "-t", &head.to_hex()]).trim(), "commit");
}
