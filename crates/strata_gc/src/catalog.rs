//! Catalog records: one immutable directory listing per subtree per revision.

use crate::hash::ObjectHash;
use serde::{Deserialize, Serialize};

/// A data object referenced by a catalog, with its payload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Content hash of the object (file or chunk).
    pub hash: ObjectHash,
    /// Payload size in bytes.
    pub size: u64,
}

/// An immutable catalog, keyed by its content hash.
///
/// `parent` and `previous` are identity references: catalogs never own one
/// another, the object store owns them all. `parent` points at the enclosing
/// catalog of the same revision (null at the root), `previous` at the same
/// subtree in the prior revision (null at first appearance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Content hash, catalog suffix.
    pub hash: ObjectHash,
    /// Subtree mount point, empty for the root catalog.
    pub root_path: String,
    /// Revision this catalog belongs to.
    pub revision: u64,
    /// Publication timestamp, seconds since the epoch.
    pub timestamp: i64,
    /// Whether this is the root catalog of its revision.
    pub is_root: bool,
    /// Enclosing catalog in the same revision.
    pub parent: Option<ObjectHash>,
    /// Same subtree in the previous revision.
    pub previous: Option<ObjectHash>,
    /// Referenced file and chunk objects.
    pub objects: Vec<ObjectRef>,
    /// Nested catalog references.
    pub nested: Vec<ObjectHash>,
}

impl Catalog {
    /// Creates an empty catalog; `is_root` is derived from `parent`.
    pub fn new(
        hash: ObjectHash,
        root_path: impl Into<String>,
        revision: u64,
        timestamp: i64,
        parent: Option<ObjectHash>,
        previous: Option<ObjectHash>,
    ) -> Self {
        Self {
            hash,
            root_path: root_path.into(),
            revision,
            timestamp,
            is_root: parent.is_none(),
            parent,
            previous,
            objects: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Appends a referenced data object.
    pub fn add_object(&mut self, hash: ObjectHash, size: u64) {
        self.objects.push(ObjectRef { hash, size });
    }

    /// Appends a nested catalog reference.
    pub fn register_nested(&mut self, hash: ObjectHash) {
        self.nested.push(hash);
    }
}
