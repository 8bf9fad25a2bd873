//! Access to the object store's catalogs and history databases.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::hash::ObjectHash;
use crate::history::History;
use serde::{Deserialize, Serialize};

/// The repository head: the current root catalog and history database.
///
/// A null `history` hash means the repository carries no history database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Root catalog of the newest revision.
    pub root_catalog: ObjectHash,
    /// Current history database.
    pub history: ObjectHash,
}

/// Retrieves top-level objects by hash.
///
/// A miss is a first-class result (`Ok(None)`), not an error: the collector
/// tolerates partially deleted history (see the sweeper's skip handling).
/// `GcError::Corrupt` aborts the run.
pub trait ObjectFetcher: Send + Sync {
    /// The current repository head.
    fn head(&self) -> Result<Manifest>;

    /// Fetches a catalog. `path_hint` is the expected mount point, for
    /// diagnostics and backend-side lookups only.
    fn catalog(&self, hash: &ObjectHash, path_hint: &str) -> Result<Option<Catalog>>;

    /// Fetches a history database.
    fn history(&self, hash: &ObjectHash) -> Result<Option<History>>;
}
