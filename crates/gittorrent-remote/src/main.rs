//! git-remote-gittorrent: fetch repositories over gittorrent.
//!
//! Usage: git clone gittorrent://<key>/<repository>
//!
//! git runs the helper as `git-remote-gittorrent <remote> <url>` and talks to
//! it over stdin/stdout.

use anyhow::Context;
use clap::Parser;
use gittorrent_dht::resolve;
use gittorrent_git::{Git, IndexPack};
use gittorrent_node::config::default_config_dir;
use gittorrent_node::observability::init_logging;
use gittorrent_node::{Backends, Config, NodeError};
use gittorrent_remote::{Bridge, BridgeExit, Orchestrator, RemoteUrl};
use gittorrent_types::{refs, RefMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{debug, info, warn};

/// gittorrent remote helper
#[derive(Parser, Debug)]
#[command(name = "git-remote-gittorrent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Remote name
    remote: String,

    /// Remote URL
    url: String,

    /// Configuration directory (default: $XDG_CONFIG_HOME/gittorrent)
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_dir = match args.config_dir {
        Some(dir) => dir,
        None => default_config_dir().ok_or(NodeError::NoConfigDir)?,
    };
    let config = Config::load(&config_dir)?;
    init_logging(&config.log_level, config.log_format());
    debug!(remote = %args.remote, url = %args.url, "git-remote-gittorrent started");

    let url = RemoteUrl::parse(&args.url)?;
    let git = Git::new(config.git.clone());
    let backends = Backends::local(&config);

    let refs: RefMap = match &url {
        RemoteUrl::Plain(target) => {
            let listed = git
                .ls_remote(target)
                .await
                .with_context(|| format!("listing {target}"))?;
            listed
                .into_iter()
                .filter(|r| refs::is_published(&r.name))
                .map(|r| (r.name, r.id))
                .collect()
        }
        RemoteUrl::Dht { key, repository } => {
            backends.dht.ready().await.context("starting DHT")?;
            match resolve(backends.dht.as_ref(), &key.to_hex()).await {
                Ok(directory) => {
                    let refs = directory.refs_for(repository);
                    if refs.is_empty() {
                        warn!(key = %key, repository = %repository, "Repository not found in directory");
                    }
                    refs
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Could not resolve directory");
                    RefMap::new()
                }
            }
        }
    };
    info!(url = %url, refs = refs.len(), "Remote listed");

    let downloads = tempfile::Builder::new()
        .prefix("gittorrent-")
        .tempdir()
        .context("creating download directory")?;
    let mut orchestrator = Orchestrator::new(
        Arc::clone(&backends.dht),
        Arc::clone(&backends.swarm),
        Arc::clone(&backends.connector),
        Arc::new(IndexPack::new(git)),
        downloads.path(),
    );

    let mut bridge = Bridge::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), refs);
    if let BridgeExit::Fetched(report) = bridge.run(&mut orchestrator).await? {
        info!(
            goals = report.goals.len(),
            ingested = report.ingested,
            rejected = report.rejected,
            "Fetch complete"
        );
    }
    Ok(())
}
