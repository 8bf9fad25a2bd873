//! History databases: named snapshots, branches and the recycle bin.

use crate::hash::ObjectHash;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Capacity of the per-database recycle bin; the oldest entry is evicted
/// once the ring is full.
pub const RECYCLE_BIN_CAPACITY: usize = 64;

/// A named snapshot pinning a root catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// User-assigned name, unique per database.
    pub name: String,
    /// Root catalog the snapshot points at.
    pub root_hash: ObjectHash,
    /// Size of the root catalog in bytes.
    pub size: u64,
    /// Revision the snapshot was taken from.
    pub revision: u64,
    /// Creation timestamp, seconds since the epoch.
    pub timestamp: i64,
    /// Free-form description.
    pub description: String,
    /// Branch the snapshot lives on; empty for the trunk.
    pub branch: String,
}

/// A named line of snapshots diverging from the trunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Parent branch name; empty for the trunk.
    pub parent: String,
    /// Revision the branch diverged at.
    pub initial_revision: u64,
}

/// One history database in the chain of published histories.
///
/// Removing a tag parks its root hash in the recycle bin, so a snapshot that
/// was unlinked since the last collection stays recoverable until the bin
/// entry itself is dropped (see the collector's orphan recovery).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    tags: BTreeMap<String, Tag>,
    branches: Vec<Branch>,
    recycle_bin: VecDeque<ObjectHash>,
    /// Hash of the previously published history database.
    pub previous: Option<ObjectHash>,
}

impl History {
    /// Creates an empty history database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag; returns false if the name is already taken.
    pub fn insert_tag(&mut self, tag: Tag) -> bool {
        if self.tags.contains_key(&tag.name) {
            return false;
        }
        self.tags.insert(tag.name.clone(), tag);
        true
    }

    /// Removes a tag by name, parking its root hash in the recycle bin.
    /// Returns false if no such tag exists.
    pub fn remove_tag(&mut self, name: &str) -> bool {
        match self.tags.remove(name) {
            Some(tag) => {
                if self.recycle_bin.len() == RECYCLE_BIN_CAPACITY {
                    self.recycle_bin.pop_front();
                }
                self.recycle_bin.push_back(tag.root_hash);
                true
            }
            None => false,
        }
    }

    /// Looks up a tag by name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    /// All tags, over every branch, ordered by name.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    /// Number of tags in this database.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Registers a branch; returns false if the name is already taken.
    pub fn insert_branch(&mut self, branch: Branch) -> bool {
        if self.branches.iter().any(|b| b.name == branch.name) {
            return false;
        }
        self.branches.push(branch);
        true
    }

    /// All registered branches.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Root hashes of recently removed tags, oldest first.
    pub fn recycle_bin(&self) -> impl Iterator<Item = &ObjectHash> {
        self.recycle_bin.iter()
    }

    /// Drops every recycle-bin entry.
    pub fn clear_recycle_bin(&mut self) {
        self.recycle_bin.clear();
    }
}
