//! Node configuration.
//!
//! Layered, later layers winning:
//!
//! 1. built-in defaults, derived from the configuration directory;
//! 2. `<config_dir>/config.yaml`, written with the defaults on first run;
//! 3. environment variables `GITTORRENT_<KEY>` and `GITTORRENT_<SECTION>__<KEY>`,
//!    e.g. `GITTORRENT_DHT__ANNOUNCE=7000`.

use crate::observability::LogFormat;
use crate::{NodeError, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "GITTORRENT";

/// `$XDG_CONFIG_HOME/gittorrent` or the platform equivalent.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("gittorrent"))
}

/// DHT settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhtConfig {
    /// TCP port of the peer-wire listener, announced with every object id.
    pub announce: u16,
    /// Address advertised with announcements.
    pub host: IpAddr,
    /// Directory holding the local DHT table.
    pub state_dir: PathBuf,
}

/// Transfer engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Directory holding seeded files.
    pub dir: PathBuf,
}

/// Everything a gittorrent process can be configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Key file; relative paths are taken from the configuration directory.
    pub key: PathBuf,
    /// Root scanned for exported repositories.
    pub repositories: PathBuf,
    /// Where generated packs are written.
    pub work_dir: PathBuf,
    /// git executable.
    pub git: String,
    /// Seconds between publish cycles.
    pub publish_interval_secs: u64,
    /// DHT settings.
    pub dht: DhtConfig,
    /// Transfer engine settings.
    pub swarm: SwarmConfig,
    /// Default log level.
    pub log_level: String,
    /// `pretty` or `json`.
    pub log_format: String,

    /// The directory this configuration was loaded from.
    #[serde(skip)]
    pub config_dir: PathBuf,
}

impl Config {
    /// Built-in defaults for a configuration directory.
    #[must_use]
    pub fn defaults(config_dir: &Path) -> Self {
        Self {
            key: PathBuf::from("key.json"),
            repositories: PathBuf::from("."),
            work_dir: config_dir.join("packs"),
            git: "git".to_string(),
            publish_interval_secs: 600,
            dht: DhtConfig {
                announce: 6882,
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                state_dir: config_dir.join("dht"),
            },
            swarm: SwarmConfig {
                dir: config_dir.join("swarm"),
            },
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            config_dir: config_dir.to_path_buf(),
        }
    }

    /// Loads the configuration for `config_dir`, reading the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be read or the result does not
    /// deserialize.
    pub fn load(config_dir: &Path) -> Result<Self> {
        Self::load_with_env(config_dir, None)
    }

    /// Like [`Config::load`], with `env` standing in for the process
    /// environment when given.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be read or the result does not
    /// deserialize.
    pub fn load_with_env(config_dir: &Path, env: Option<config::Map<String, String>>) -> Result<Self> {
        let defaults = Self::defaults(config_dir);
        let file = config_dir.join(CONFIG_FILE);
        if !file.exists() {
            write_defaults(&file, &defaults)?;
        }

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&defaults)?)
            .add_source(File::from(file).format(FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        config.config_dir = config_dir.to_path_buf();
        Ok(config)
    }

    /// Resolves [`Config::key`] against the configuration directory.
    #[must_use]
    pub fn key_path(&self) -> PathBuf {
        if self.key.is_absolute() {
            self.key.clone()
        } else {
            self.config_dir.join(&self.key)
        }
    }

    /// Parsed [`Config::log_format`].
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.log_format)
    }
}

fn write_defaults(file: &Path, defaults: &Config) -> Result<()> {
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(defaults)?;
    std::fs::write(file, yaml).map_err(NodeError::Io)?;
    info!(path = %file.display(), "Wrote default configuration");
    Ok(())
}
