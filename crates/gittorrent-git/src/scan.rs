//! Discovery of exported repositories under a root directory.

use crate::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Marker file that opts a repository into export.
pub const EXPORT_OK: &str = "git-daemon-export-ok";

/// A repository found by [`scan_repositories`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedRepository {
    /// Directory name under the root; the published repository name.
    pub name: String,
    /// The git directory holding the marker.
    pub path: PathBuf,
}

/// Finds `<root>/<name>/` or `<root>/<name>/.git/` directories that contain
/// [`EXPORT_OK`], sorted by name.
///
/// # Errors
///
/// Returns an error if `root` cannot be read.
pub fn scan_repositories(root: &Path) -> Result<Vec<ExportedRepository>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory loop while scanning"))
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        let git_dir = [dir.to_path_buf(), dir.join(".git")]
            .into_iter()
            .find(|candidate| candidate.join(EXPORT_OK).is_file());
        if let Some(path) = git_dir {
            found.push(ExportedRepository {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
            });
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn finds_bare_and_worktree_exports() {
        let root = tempfile::tempdir().unwrap();
        let bare = root.path().join("bare.git");
        let work = root.path().join("work");
        let hidden = root.path().join("private");
        fs::create_dir_all(&bare).unwrap();
        fs::create_dir_all(work.join(".git")).unwrap();
        fs::create_dir_all(&hidden).unwrap();
        fs::write(bare.join(EXPORT_OK), "").unwrap();
        fs::write(work.join(".git").join(EXPORT_OK), "").unwrap();
        fs::write(root.path().join(EXPORT_OK), "").unwrap();

        let found = scan_repositories(root.path()).unwrap();
        assert_eq!(
            found,
            vec![
                ExportedRepository {
                    name: "bare.git".into(),
                    path: bare,
                },
                ExportedRepository {
                    name: "work".into(),
                    path: work.join(".git"),
                },
            ]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(scan_repositories(Path::new("/nonexistent/gittorrent-root")).is_err());
    }
}
