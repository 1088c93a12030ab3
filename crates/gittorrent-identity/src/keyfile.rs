//! The key file a node keeps its signing key in.
//!
//! The file is JSON, `{"pub":"<hex>","priv":"<hex>"}`, created on first run
//! with owner-only permissions.

use crate::{IdentityError, Keypair, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;
use zeroize::Zeroizing;

/// On-disk form of a keypair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFile {
    /// Hex public key.
    #[serde(rename = "pub")]
    pub public: String,
    /// Hex secret seed.
    #[serde(rename = "priv")]
    pub secret: String,
}

impl KeyFile {
    /// Captures a keypair.
    #[must_use]
    pub fn from_keypair(keypair: &Keypair) -> Self {
        Self {
            public: keypair.public_key().to_string(),
            secret: hex::encode(&*keypair.secret_bytes()),
        }
    }

    /// Rebuilds the keypair, checking that the stored public key matches.
    ///
    /// # Errors
    ///
    /// Returns an error if either field is not valid hex or the halves disagree.
    pub fn to_keypair(&self, path: &Path) -> Result<Keypair> {
        let invalid = |reason: String| IdentityError::KeyFile {
            path: path.to_path_buf(),
            reason,
        };
        let secret = Zeroizing::new(hex::decode(&self.secret).map_err(|e| invalid(e.to_string()))?);
        let keypair = Keypair::from_secret_bytes(&secret)?;
        if keypair.public_key().to_string() != self.public.to_lowercase() {
            return Err(invalid("public key does not match secret key".into()));
        }
        Ok(keypair)
    }
}

/// Loads the keypair at `path`, generating and saving a new one if absent.
///
/// # Errors
///
/// Returns an error if the file exists but is unreadable or malformed, or if
/// a new file cannot be written.
pub fn load_or_create(path: &Path) -> Result<Keypair> {
    match fs::read(path) {
        Ok(bytes) => {
            let file: KeyFile = serde_json::from_slice(&bytes).map_err(|e| IdentityError::KeyFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            file.to_keypair(path)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let keypair = Keypair::generate();
            write_private(path, &KeyFile::from_keypair(&keypair))?;
            info!(path = %path.display(), public_key = %keypair.public_key(), "Generated new signing key");
            Ok(keypair)
        }
        Err(e) => Err(e.into()),
    }
}

fn write_private(path: &Path, file: &KeyFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec(file).map_err(|e| IdentityError::KeyFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut out = options.open(path)?;
    out.write_all(&json)?;
    out.sync_all()?;
    Ok(())
}
