//! Catalog traversal: the trunk history walk and revision-tree walks.
//!
//! A [`Traversal`] carries a claim table shared by every walk made through
//! it, so each catalog is yielded at most once per collection run no matter
//! how many entry points reach it. Trees are visited bottom-up: a catalog is
//! yielded only after all of its newly claimed nested children, which the
//! sweeper relies on to delete descendants before their parent.

mod parallel;
mod serial;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::fetcher::ObjectFetcher;
use crate::hash::ObjectHash;
use crate::reflog::Reflog;
use dashmap::DashSet;
use parallel::ParallelWalker;
use serial::SerialWalker;
use std::sync::Arc;
use tracing::warn;

/// Visitor callback; a returned error aborts the walk.
pub type VisitFn<'a> = dyn FnMut(&Catalog) -> Result<()> + 'a;

/// Where the trunk walk reads a root catalog's timestamp from.
#[derive(Clone)]
pub enum TimestampSource {
    /// The timestamp embedded in the catalog itself.
    Embedded,
    /// The reflog registration time; falls back to the embedded timestamp
    /// for roots the reflog does not know.
    Reflog(Arc<dyn Reflog>),
}

/// Pruning policy for the trunk walk.
#[derive(Clone)]
pub struct TraversalParams {
    /// How many historic revisions to follow behind the head; `None` keeps
    /// the whole chain.
    pub history_depth: Option<u64>,
    /// Stop following `previous` below this timestamp; the first root below
    /// the cutoff is still visited (it was the current revision at the
    /// cutoff instant).
    pub timestamp_cutoff: Option<i64>,
    /// Timestamp source for the cutoff comparison.
    pub timestamp_source: TimestampSource,
}

impl Default for TraversalParams {
    fn default() -> Self {
        Self {
            history_depth: None,
            timestamp_cutoff: None,
            timestamp_source: TimestampSource::Embedded,
        }
    }
}

/// Shared state handed to a tree-walking strategy.
pub(crate) struct WalkContext<'a> {
    pub(crate) fetcher: &'a dyn ObjectFetcher,
    pub(crate) visited: &'a DashSet<ObjectHash>,
    pub(crate) missing: &'a DashSet<ObjectHash>,
}

/// A strategy for walking one revision tree.
///
/// Contract: every catalog reachable through unclaimed nested links is
/// claimed in `ctx.visited` and yielded exactly once, after all children it
/// claimed. A missing nested catalog prunes its subtree; a missing root
/// makes `walk` return `Ok(false)` — also when a later walk starts at a
/// hash that already turned out missing (tracked in `ctx.missing`, since
/// the claim table alone cannot tell "yielded" from "not found"). The
/// visitor is always invoked from the calling thread.
pub(crate) trait TreeWalker: Send + Sync {
    fn walk(
        &self,
        ctx: &WalkContext<'_>,
        root: ObjectHash,
        path_hint: &str,
        visit: &mut VisitFn<'_>,
    ) -> Result<bool>;
}

/// Walks catalog DAGs against an object fetcher, serially or with a worker
/// pool, deduplicating across all walks of the same instance.
pub struct Traversal {
    fetcher: Arc<dyn ObjectFetcher>,
    walker: Box<dyn TreeWalker>,
    visited: DashSet<ObjectHash>,
    missing: DashSet<ObjectHash>,
}

impl Traversal {
    /// Creates a traversal; `num_threads <= 1` selects the serial strategy,
    /// larger values a pool of that many workers.
    pub fn new(fetcher: Arc<dyn ObjectFetcher>, num_threads: usize) -> Self {
        let walker: Box<dyn TreeWalker> = if num_threads <= 1 {
            Box::new(SerialWalker)
        } else {
            Box::new(ParallelWalker::new(num_threads))
        };
        Self {
            fetcher,
            walker,
            visited: DashSet::new(),
            missing: DashSet::new(),
        }
    }

    /// Walks the trunk: the head revision tree, then the `previous` chain of
    /// root catalogs under the pruning policy. The walk stops after the
    /// first root that exhausts the depth budget or falls below the
    /// timestamp cutoff; a missing root ends the chain without error.
    pub fn traverse_head(&self, params: &TraversalParams, visit: &mut VisitFn<'_>) -> Result<()> {
        let manifest = self.fetcher.head()?;
        let mut next = Some(manifest.root_catalog);
        let mut hops = 0u64;

        while let Some(hash) = next.take() {
            let Some(root) = self.fetcher.catalog(&hash, "")? else {
                warn!(hash = %hash, "trunk catalog missing, stopping history walk");
                break;
            };
            self.walker.walk(&self.context(), hash, &root.root_path, visit)?;

            let depth_ok = params.history_depth.map_or(true, |depth| hops < depth);
            let ts_ok = match params.timestamp_cutoff {
                None => true,
                Some(cutoff) => self.effective_timestamp(&root, params)? >= cutoff,
            };
            if !(depth_ok && ts_ok) {
                break;
            }
            next = root.previous.filter(|p| !p.is_null());
            hops += 1;
        }
        Ok(())
    }

    /// Walks one revision tree, never following `previous` links. Returns
    /// false iff the root catalog itself was not found, including when an
    /// earlier walk already probed the same hash and missed; an
    /// already-yielded root is a no-op returning true.
    pub fn traverse_revision(&self, root: ObjectHash, visit: &mut VisitFn<'_>) -> Result<bool> {
        self.walker.walk(&self.context(), root, "", visit)
    }

    fn context(&self) -> WalkContext<'_> {
        WalkContext {
            fetcher: self.fetcher.as_ref(),
            visited: &self.visited,
            missing: &self.missing,
        }
    }

    fn effective_timestamp(&self, root: &Catalog, params: &TraversalParams) -> Result<i64> {
        match &params.timestamp_source {
            TimestampSource::Embedded => Ok(root.timestamp),
            TimestampSource::Reflog(reflog) => {
                Ok(reflog.timestamp(&root.hash)?.unwrap_or(root.timestamp))
            }
        }
    }
}
