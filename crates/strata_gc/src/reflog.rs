//! The reflog: every root catalog the repository has ever published.

use crate::error::Result;
use crate::hash::ObjectHash;

/// One reflog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflogEntry {
    /// Root catalog hash.
    pub hash: ObjectHash,
    /// Last registration time, seconds since the epoch.
    pub registered_at: i64,
}

/// Durable registry of published root catalogs. The reflog is external
/// state: the collector enumerates it to find sweep candidates and removes
/// entries as their catalogs are deleted. Failures here are hard errors.
pub trait Reflog: Send + Sync {
    /// All registered root catalogs; iteration order carries no meaning.
    fn catalogs(&self) -> Result<Vec<ReflogEntry>>;

    /// Removes one entry. Removing an absent entry is a no-op.
    fn remove(&self, hash: &ObjectHash) -> Result<()>;

    /// Last registration time of the given hash, if present.
    fn timestamp(&self, hash: &ObjectHash) -> Result<Option<i64>>;
}
