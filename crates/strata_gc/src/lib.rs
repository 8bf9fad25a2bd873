//! Garbage collection for Strata repositories.
//!
//! A Strata repository stores immutable, content-addressed objects: file
//! data, file chunks, catalogs (one directory listing per subtree per
//! revision, forming a tree via nested links and a history chain via
//! `previous` links), and history databases holding named snapshots. This
//! crate implements the reachability-based sweeper that, given a retention
//! policy, enumerates the live catalogs and objects and deletes everything
//! else — exactly once, and never anything live.
//!
//! The collector runs in two strictly ordered phases:
//!
//! 1. **Mark**: walk the trunk from the head under the configured depth and
//!    timestamp policy, every named snapshot of the current history
//!    database, and the recycle bins of preceding history databases, filling
//!    a concurrent live filter.
//! 2. **Sweep**: enumerate the reflog, walk every root that is not live
//!    bottom-up, and emit each non-live hash once — to the deletion log, to
//!    the uploader as an asynchronous delete, and (for catalogs) as a reflog
//!    removal.
//!
//! Storage access, the reflog and the delete sink are collaborator traits
//! ([`ObjectFetcher`], [`Reflog`], [`Uploader`]) supplied through
//! [`GcConfig`]; the crate opens no connections and persists no state of
//! its own. Catalog trees can be walked serially or with a bounded worker
//! pool (`GcConfig::num_threads`), behind the same visit contract.

mod catalog;
mod collector;
mod config;
mod error;
mod fetcher;
mod filter;
mod hash;
mod history;
mod reflog;
mod traversal;
mod uploader;

pub use catalog::{Catalog, ObjectRef};
pub use collector::{GarbageCollector, GcReport};
pub use config::GcConfig;
pub use error::{GcError, Result};
pub use fetcher::{Manifest, ObjectFetcher};
pub use filter::HashFilter;
pub use hash::{ObjectHash, Suffix};
pub use history::{Branch, History, Tag, RECYCLE_BIN_CAPACITY};
pub use reflog::{Reflog, ReflogEntry};
pub use traversal::{TimestampSource, Traversal, TraversalParams, VisitFn};
pub use uploader::Uploader;
