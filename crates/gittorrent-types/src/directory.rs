//! The repository directory a node publishes under its key.

use crate::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ref name to object id, for one repository.
pub type RefMap = BTreeMap<String, ObjectId>;

/// Every repository a node exports, with the refs it publishes for each.
///
/// Sorted maps keep the serialized form byte-for-byte stable between
/// publish cycles that see the same refs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDirectory {
    /// Repository name to its published refs.
    pub repositories: BTreeMap<String, RefMap>,
}

impl RepositoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a repository with no refs yet.
    pub fn add_repository(&mut self, name: impl Into<String>) {
        self.repositories.entry(name.into()).or_default();
    }

    /// Records a ref of a repository, creating the repository entry if needed.
    pub fn insert(&mut self, repository: impl Into<String>, ref_name: impl Into<String>, id: ObjectId) {
        self.repositories
            .entry(repository.into())
            .or_default()
            .insert(ref_name.into(), id);
    }

    /// Returns the refs of one repository, if present.
    #[must_use]
    pub fn repository(&self, name: &str) -> Option<&RefMap> {
        self.repositories.get(name)
    }

    /// Returns the refs of one repository, empty when it is not published.
    #[must_use]
    pub fn refs_for(&self, name: &str) -> RefMap {
        self.repositories.get(name).cloned().unwrap_or_default()
    }

    /// Returns true if no repository is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}
