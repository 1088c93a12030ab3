//! Which objects this node announced and where they live.

use gittorrent_git::RemoteRef;
use gittorrent_types::{refs, ObjectId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Object id to repository path, plus each repository's head.
///
/// Rebuilt by every publish cycle and swapped in whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncedIndex {
    objects: HashMap<ObjectId, PathBuf>,
    heads: HashMap<PathBuf, ObjectId>,
}

impl AnnouncedIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the published refs of one repository.
    ///
    /// The head is `HEAD` when listed, otherwise `refs/heads/master`.
    pub fn insert_repository(&mut self, path: &Path, listed: &[RemoteRef]) {
        let mut head = None;
        let mut master = None;
        for r in listed.iter().filter(|r| refs::is_published(&r.name)) {
            self.objects.entry(r.id).or_insert_with(|| path.to_path_buf());
            if r.name == "HEAD" {
                head = Some(r.id);
            } else if r.name == refs::MASTER {
                master = Some(r.id);
            }
        }
        if let Some(head) = head.or(master) {
            self.heads.insert(path.to_path_buf(), head);
        }
    }

    /// The repository an announced object was found in.
    #[must_use]
    pub fn repository_for(&self, id: &ObjectId) -> Option<&Path> {
        self.objects.get(id).map(PathBuf::as_path)
    }

    /// The head of a repository.
    #[must_use]
    pub fn head_of(&self, repository: &Path) -> Option<ObjectId> {
        self.heads.get(repository).copied()
    }

    /// Whether `id` is announced.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Number of announced objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is announced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// A shared, swappable [`AnnouncedIndex`].
///
/// Readers take a snapshot; the publisher replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct IndexHandle {
    inner: Arc<RwLock<Arc<AnnouncedIndex>>>,
}

impl IndexHandle {
    /// Creates a handle holding an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<AnnouncedIndex> {
        Arc::clone(&self.inner.read())
    }

    /// Installs a new index.
    pub fn replace(&self, index: AnnouncedIndex) {
        *self.inner.write() = Arc::new(index);
    }
}
