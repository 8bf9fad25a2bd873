//! Run configuration for the garbage collector.

use crate::fetcher::ObjectFetcher;
use crate::reflog::Reflog;
use crate::uploader::Uploader;
use std::io::Write;
use std::sync::Arc;

/// Everything one collection run needs: the retention policy and the three
/// collaborators. There is no ambient state; a config is built by the caller
/// and consumed by [`crate::GarbageCollector::new`].
pub struct GcConfig {
    /// Historic revisions to preserve behind the head; `None` preserves the
    /// whole chain.
    pub keep_history_depth: Option<u64>,
    /// Preserve every revision that was current at or after this time,
    /// seconds since the epoch.
    pub keep_history_timestamp: Option<i64>,
    /// Write the deletion log but neither delete nor touch the reflog.
    pub dry_run: bool,
    /// Compare `keep_history_timestamp` against reflog registration times
    /// instead of catalog-embedded timestamps.
    pub use_reflog_timestamps: bool,
    /// Traversal workers; 1 selects the serial strategy.
    pub num_threads: usize,
    /// Receives one line per condemned hash when set.
    pub deletion_log: Option<Box<dyn Write + Send>>,
    /// Catalog and history access.
    pub fetcher: Arc<dyn ObjectFetcher>,
    /// Delete-request sink.
    pub uploader: Arc<dyn Uploader>,
    /// Root catalog registry.
    pub reflog: Arc<dyn Reflog>,
}

impl GcConfig {
    /// Default policy: keep the head plus one historic revision, serial
    /// traversal, no timestamp cutoff, no deletion log.
    pub fn new(
        fetcher: Arc<dyn ObjectFetcher>,
        uploader: Arc<dyn Uploader>,
        reflog: Arc<dyn Reflog>,
    ) -> Self {
        Self {
            keep_history_depth: Some(1),
            keep_history_timestamp: None,
            dry_run: false,
            use_reflog_timestamps: false,
            num_threads: 1,
            deletion_log: None,
            fetcher,
            uploader,
            reflog,
        }
    }
}
