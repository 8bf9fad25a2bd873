//! The reachability sweeper: mark live, freeze, sweep condemned.

use crate::catalog::Catalog;
use crate::config::GcConfig;
use crate::error::{GcError, Result};
use crate::filter::HashFilter;
use crate::hash::ObjectHash;
use crate::traversal::{TimestampSource, Traversal, TraversalParams};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome counters of a collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Catalogs kept alive by the retention policy.
    pub preserved_catalogs: u64,
    /// Catalogs actually swept (missing ones are skipped, not counted).
    pub condemned_catalogs: u64,
    /// Data objects swept, counted uniquely; excludes catalogs.
    pub condemned_objects: u64,
    /// Payload bytes behind the swept data objects.
    pub condemned_bytes: u64,
    /// Minimum timestamp among preserved trunk root catalogs; equals the
    /// head timestamp when all history is pruned, `None` only when the head
    /// itself could not be resolved.
    pub oldest_trunk_timestamp: Option<i64>,
}

/// Deletes everything the retention policy does not reach.
///
/// A run has two strictly ordered phases. Phase A walks the live roots (the
/// trunk under the depth/timestamp policy, every tag of the current history
/// database, and the recycle bins of all preceding history databases) and
/// fills the live filter. Only once that filter is frozen does phase B
/// enumerate the reflog and sweep every root not marked live, bottom-up, so
/// that a catalog's objects and descendants are condemned before the catalog
/// itself disappears from the reflog.
pub struct GarbageCollector {
    config: GcConfig,
    traversal: Traversal,
    live: HashFilter,
    condemned: HashFilter,
    deletion_log: Option<Box<dyn Write + Send>>,
    report: GcReport,
}

impl GarbageCollector {
    /// Prepares a run; the traversal strategy follows `config.num_threads`.
    pub fn new(mut config: GcConfig) -> Self {
        let traversal = Traversal::new(Arc::clone(&config.fetcher), config.num_threads);
        let deletion_log = config.deletion_log.take();
        Self {
            config,
            traversal,
            live: HashFilter::new(),
            condemned: HashFilter::new(),
            deletion_log,
            report: GcReport::default(),
        }
    }

    /// Runs the collection. Outstanding deletes are drained before this
    /// returns, also on the failure path; delete failures turn the result
    /// into `GcError::UploaderErrors`.
    pub fn collect(mut self) -> Result<GcReport> {
        info!(
            keep_history_depth = ?self.config.keep_history_depth,
            keep_history_timestamp = ?self.config.keep_history_timestamp,
            dry_run = self.config.dry_run,
            "starting garbage collection"
        );

        let outcome = self.run();
        // drain the uploader and the deletion log also on the failure path:
        // entries for already-issued deletes must not be lost
        self.config.uploader.flush();
        let log_flushed = match self.deletion_log.as_mut() {
            Some(log) => log.flush().map_err(GcError::from),
            None => Ok(()),
        };

        outcome?;
        log_flushed?;
        let upload_errors = self.config.uploader.error_count();
        if upload_errors > 0 {
            return Err(GcError::UploaderErrors(upload_errors));
        }

        info!(
            preserved = self.report.preserved_catalogs,
            condemned_catalogs = self.report.condemned_catalogs,
            condemned_objects = self.report.condemned_objects,
            "garbage collection finished"
        );
        Ok(self.report)
    }

    fn run(&mut self) -> Result<()> {
        self.mark_preserved()?;
        // phase barrier: nothing is condemned until the live set is complete
        self.live.freeze();
        self.sweep_condemned()
    }

    /// Phase A: fill the live filter from the trunk, the named snapshots of
    /// the current history database and the recycle bins of its
    /// predecessors.
    fn mark_preserved(&mut self) -> Result<()> {
        let manifest = self.config.fetcher.head()?;

        let params = TraversalParams {
            history_depth: self.config.keep_history_depth,
            timestamp_cutoff: self.config.keep_history_timestamp,
            timestamp_source: if self.config.use_reflog_timestamps {
                TimestampSource::Reflog(Arc::clone(&self.config.reflog))
            } else {
                TimestampSource::Embedded
            },
        };

        {
            let live = &self.live;
            let report = &mut self.report;
            self.traversal.traverse_head(&params, &mut |catalog| {
                report.preserved_catalogs += 1;
                if catalog.is_root {
                    let oldest = report.oldest_trunk_timestamp.get_or_insert(catalog.timestamp);
                    *oldest = (*oldest).min(catalog.timestamp);
                }
                mark_live(live, catalog);
                Ok(())
            })?;
        }

        for root in self.pinned_snapshot_roots(manifest.history)? {
            let live = &self.live;
            let report = &mut self.report;
            let found = self.traversal.traverse_revision(root, &mut |catalog| {
                report.preserved_catalogs += 1;
                mark_live(live, catalog);
                Ok(())
            })?;
            if !found {
                warn!(hash = %root, "retained snapshot points at a missing catalog, downgrading to not-live");
            }
        }
        Ok(())
    }

    /// Root catalogs pinned through the history chain: every tag of the
    /// current database, plus the recycle-bin entries of each preceding
    /// database. The latter recover snapshots that were unlinked since the
    /// last run, so a named snapshot only becomes collectable once its bin
    /// entry is gone. The history databases themselves are marked live.
    fn pinned_snapshot_roots(&self, history_hash: ObjectHash) -> Result<Vec<ObjectHash>> {
        let mut pinned = Vec::new();
        if history_hash.is_null() {
            return Ok(pinned);
        }

        let mut seen = HashSet::new();
        let mut next = Some(history_hash);
        let mut is_current = true;
        while let Some(hash) = next.take() {
            if !seen.insert(hash) {
                warn!(hash = %hash, "history chain loops, stopping");
                break;
            }
            self.live.fill(&hash);
            let Some(history) = self.config.fetcher.history(&hash)? else {
                warn!(hash = %hash, "history database missing, stopping chain");
                break;
            };
            if is_current {
                pinned.extend(history.tags().map(|tag| tag.root_hash));
            } else {
                pinned.extend(history.recycle_bin().copied());
            }
            next = history.previous.filter(|p| !p.is_null());
            is_current = false;
        }
        Ok(pinned)
    }

    /// Phase B: sweep every reflog root that is not live.
    fn sweep_condemned(&mut self) -> Result<()> {
        let entries = self.config.reflog.catalogs()?;
        info!(registered = entries.len(), "sweeping against the reflog");

        for entry in entries {
            if self.live.contains(&entry.hash) {
                continue;
            }
            let GarbageCollector {
                config,
                traversal,
                live,
                condemned,
                deletion_log,
                report,
            } = self;

            let found = traversal.traverse_revision(entry.hash, &mut |catalog: &Catalog| {
                for object in &catalog.objects {
                    if live.contains(&object.hash) || !condemned.fill(&object.hash) {
                        continue;
                    }
                    if let Some(log) = deletion_log.as_mut() {
                        writeln!(log, "{}", object.hash)?;
                    }
                    if !config.dry_run {
                        config.uploader.remove_async(&object.hash.storage_path());
                    }
                    report.condemned_objects += 1;
                    report.condemned_bytes += object.size;
                }

                // descendants and objects are gone; now the catalog itself
                condemned.fill(&catalog.hash);
                if let Some(log) = deletion_log.as_mut() {
                    writeln!(log, "{}", catalog.hash)?;
                }
                if !config.dry_run {
                    config.uploader.remove_async(&catalog.hash.storage_path());
                    config.reflog.remove(&catalog.hash)?;
                }
                report.condemned_catalogs += 1;
                debug!(hash = %catalog.hash, revision = catalog.revision, "condemned catalog");
                Ok(())
            })?;

            if !found {
                warn!(hash = %entry.hash, "condemned catalog already gone, nothing to sweep");
            }
        }
        Ok(())
    }
}

fn mark_live(live: &HashFilter, catalog: &Catalog) {
    live.fill(&catalog.hash);
    for object in &catalog.objects {
        live.fill(&object.hash);
    }
    for nested in &catalog.nested {
        live.fill(nested);
    }
}
