//! Concurrent hash-set separating live from condemned objects.

use crate::hash::ObjectHash;
use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// A write-then-read set of object hashes.
///
/// Before `freeze`, any number of producers may `fill` concurrently; the
/// sharded set guarantees no lost inserts. After `freeze`, the filter is
/// read-only and `contains` is safe from any number of readers. Filling a
/// frozen filter is a contract violation and panics.
#[derive(Debug, Default)]
pub struct HashFilter {
    set: DashSet<ObjectHash>,
    frozen: AtomicBool,
}

impl HashFilter {
    /// Creates an empty, unfrozen filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a hash; returns true if it was not present before.
    ///
    /// # Panics
    ///
    /// Panics if the filter has been frozen.
    pub fn fill(&self, hash: &ObjectHash) -> bool {
        assert!(
            !self.frozen.load(Ordering::Acquire),
            "HashFilter::fill called after freeze"
        );
        self.set.insert(*hash)
    }

    /// Membership test.
    pub fn contains(&self, hash: &ObjectHash) -> bool {
        self.set.contains(hash)
    }

    /// Ends the fill phase; the filter becomes read-only.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Whether `freeze` has been called.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Number of distinct hashes inserted.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether the filter holds no hashes.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
