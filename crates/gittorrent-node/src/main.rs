//! gittorrentd: publishes exported repositories and serves packs to peers.

use anyhow::Context;
use clap::Parser;
use gittorrent_dht::record_key;
use gittorrent_git::Git;
use gittorrent_identity::load_or_create;
use gittorrent_node::config::default_config_dir;
use gittorrent_node::observability::init_logging;
use gittorrent_node::{serve, Backends, Config, GitPackPipeline, IndexHandle, NodeError, Publisher};
use gittorrent_protocol::{PackPipeline, PeerId};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// gittorrent daemon
#[derive(Parser, Debug)]
#[command(name = "gittorrentd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration directory (default: $XDG_CONFIG_HOME/gittorrent)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Directory scanned for exported repositories
    #[arg(long)]
    repositories: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single publish cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_dir = match args.config_dir {
        Some(dir) => dir,
        None => default_config_dir().ok_or(NodeError::NoConfigDir)?,
    };
    let mut config = Config::load(&config_dir)?;
    if let Some(repositories) = args.repositories {
        config.repositories = repositories;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level, config.log_format());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting gittorrentd");
    tracing::info!(
        config_dir = %config.config_dir.display(),
        repositories = %config.repositories.display(),
        announce = config.dht.announce,
        "Node configuration"
    );

    let keypair = load_or_create(&config.key_path())
        .with_context(|| format!("loading key {}", config.key_path().display()))?;
    let key = record_key(&keypair.public_key());
    tracing::info!(key = %key, "Repositories are reachable as gittorrent://{key}/<name>");

    let backends = Backends::local(&config);
    backends.dht.ready().await.context("starting DHT")?;

    let index = IndexHandle::new();
    let git = Git::new(config.git.clone());
    let mut publisher = Publisher::new(
        Arc::clone(&backends.dht),
        keypair,
        git.clone(),
        config.repositories.clone(),
        config.dht.announce,
        index.clone(),
    );

    if args.once {
        publisher.run_cycle().await?;
        return Ok(());
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.dht.announce));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let pipeline: Arc<dyn PackPipeline> = Arc::new(GitPackPipeline::new(
        index,
        git,
        config.work_dir.clone(),
        Arc::clone(&backends.swarm),
    ));

    let server = tokio::spawn(serve(listener, pipeline, PeerId::generate()));
    let interval = Duration::from_secs(config.publish_interval_secs.max(1));
    tokio::spawn(publisher.run_periodic(interval));

    tracing::info!("Node is ready. Press Ctrl+C to stop.");
    tokio::select! {
        result = server => {
            result.context("server task panicked")?.context("peer listener failed")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("waiting for Ctrl+C")?;
            tracing::info!("Shutting down");
        }
    }
    Ok(())
}
