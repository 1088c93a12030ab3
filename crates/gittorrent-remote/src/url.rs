//! Remote URL grammar.

use crate::{RemoteError, Result};
use gittorrent_types::RecordKey;
use std::fmt;

const SCHEME: &str = "gittorrent:";
const DHT_PREFIX: &str = "gittorrent://";

/// Where the helper gets its ref list from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteUrl {
    /// `gittorrent://<40-hex-key>/<repository>`: resolve a signed directory.
    Dht {
        /// The publisher's record key.
        key: RecordKey,
        /// Repository name inside the directory.
        repository: String,
    },
    /// Anything else, listed with `git ls-remote`. A leading `gittorrent:`
    /// has already been rewritten to `git:`.
    Plain(String),
}

impl RemoteUrl {
    /// Parses the URL git handed to the helper.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidUrl`] for an empty URL or a DHT URL
    /// without a repository name.
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |reason: &str| RemoteError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        if url.trim().is_empty() {
            return Err(invalid("empty"));
        }

        if let Some((key, repository)) = split_dht(url) {
            if repository.is_empty() {
                return Err(invalid("missing repository name"));
            }
            let key = RecordKey::from_hex(key).map_err(|e| invalid(&e.to_string()))?;
            return Ok(Self::Dht {
                key,
                repository: repository.to_string(),
            });
        }

        let rewritten = match url.get(..SCHEME.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(SCHEME) => format!("git:{}", &url[SCHEME.len()..]),
            _ => url.to_string(),
        };
        Ok(Self::Plain(rewritten))
    }
}

/// Splits `gittorrent://<key>/<rest>` when `<key>` is 40 lowercase hex digits.
fn split_dht(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix(DHT_PREFIX)?;
    let (key, repository) = rest.split_once('/')?;
    let is_key = key.len() == RecordKey::HEX_LEN && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    is_key.then_some((key, repository))
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dht { key, repository } => write!(f, "{DHT_PREFIX}{key}/{repository}"),
            Self::Plain(url) => f.write_str(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const KEY: &str = "81a3e0ee3eb8c4ae8f49d4f7abb2c91eaae2cbdf";

    #[test]
    fn dht_url() {
        let url = RemoteUrl::parse(&format!("gittorrent://{KEY}/recursers")).unwrap();
        assert_eq!(
            url,
            RemoteUrl::Dht {
                key: KEY.parse().unwrap(),
                repository: "recursers".to_string(),
            }
        );
        assert_eq!(url.to_string(), format!("gittorrent://{KEY}/recursers"));
    }

    #[test]
    fn repository_may_contain_slashes() {
        let url = RemoteUrl::parse(&format!("gittorrent://{KEY}/group/project")).unwrap();
        assert!(matches!(url, RemoteUrl::Dht { repository, .. } if repository == "group/project"));
    }

    #[test]
    fn host_urls_are_rewritten_to_git() {
        assert_eq!(
            RemoteUrl::parse("gittorrent://github.com/cjb/gittorrent").unwrap(),
            RemoteUrl::Plain("git://github.com/cjb/gittorrent".to_string())
        );
        assert_eq!(
            RemoteUrl::parse("GitTorrent://example.org/repo").unwrap(),
            RemoteUrl::Plain("git://example.org/repo".to_string())
        );
    }

    #[test]
    fn uppercase_key_is_not_a_dht_url() {
        let url = RemoteUrl::parse(&format!("gittorrent://{}/repo", KEY.to_uppercase())).unwrap();
        assert!(matches!(url, RemoteUrl::Plain(u) if u.starts_with("git://")));
    }

    #[test]
    fn local_paths_pass_through() {
        assert_eq!(
            RemoteUrl::parse("/srv/git/lib").unwrap(),
            RemoteUrl::Plain("/srv/git/lib".to_string())
        );
    }

    #[test]
    fn unusable_urls() {
        assert!(RemoteUrl::parse("").is_err());
        assert!(RemoteUrl::parse(&format!("gittorrent://{KEY}/")).is_err());
    }
}
