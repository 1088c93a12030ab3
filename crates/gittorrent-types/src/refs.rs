//! Ref name helpers.

/// The ref git points `HEAD` at when a repository has no symbolic head.
pub const MASTER: &str = "refs/heads/master";

/// Prefix of branch refs.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Returns true for the refs gittorrent publishes: `HEAD` and branch heads.
///
/// Tags and other namespaces are left out to keep the signed directory
/// inside the DHT value ceiling.
#[must_use]
pub fn is_published(name: &str) -> bool {
    name == "HEAD" || name.starts_with(HEADS_PREFIX)
}

/// Reduces a ref name to the branch name used in fetch bookkeeping.
///
/// Strips a leading `refs/heads/` (or bare `refs/`) and a trailing `/head`.
#[must_use]
pub fn branch_name(name: &str) -> String {
    let name = name
        .strip_prefix(HEADS_PREFIX)
        .or_else(|| name.strip_prefix("refs/"))
        .unwrap_or(name);
    name.strip_suffix("/head").unwrap_or(name).to_string()
}
