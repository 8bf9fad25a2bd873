//! Bounded-parallel tree walker.
//!
//! Workers fetch catalogs concurrently; a claim table prevents duplicate
//! expansion and per-catalog child counters reconstruct bottom-up order.
//! Completed catalogs flow through a bounded ready-queue to the calling
//! thread, which is the only one that runs the visitor.

use super::{TreeWalker, VisitFn, WalkContext};
use crate::catalog::Catalog;
use crate::error::{GcError, Result};
use crate::hash::ObjectHash;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{HashMap, VecDeque};
use tracing::warn;

pub(crate) struct ParallelWalker {
    workers: usize,
}

impl ParallelWalker {
    pub(crate) fn new(workers: usize) -> Self {
        Self { workers }
    }
}

struct Job {
    hash: ObjectHash,
    path_hint: String,
    parent: Option<ObjectHash>,
}

/// A fetched catalog still waiting for nested children to complete.
struct Pending {
    catalog: Catalog,
    missing_children: usize,
    parent: Option<ObjectHash>,
}

struct State {
    queue: VecDeque<Job>,
    pending: HashMap<ObjectHash, Pending>,
    ready: VecDeque<Catalog>,
    fetching: usize,
    /// Workers inside `complete`, holding a catalog that is in neither
    /// `pending` nor `ready` while they wait for queue space.
    completing: usize,
    aborted: bool,
    failure: Option<GcError>,
    root_found: bool,
}

impl State {
    fn drained(&self) -> bool {
        self.queue.is_empty()
            && self.fetching == 0
            && self.pending.is_empty()
            && self.completing == 0
    }
}

struct Shared<'a> {
    ctx: &'a WalkContext<'a>,
    state: Mutex<State>,
    work_available: Condvar,
    ready_available: Condvar,
    space_available: Condvar,
    ready_bound: usize,
}

impl TreeWalker for ParallelWalker {
    fn walk(
        &self,
        ctx: &WalkContext<'_>,
        root: ObjectHash,
        path_hint: &str,
        visit: &mut VisitFn<'_>,
    ) -> Result<bool> {
        if !ctx.visited.insert(root) {
            return Ok(!ctx.missing.contains(&root));
        }

        let shared = Shared {
            ctx,
            state: Mutex::new(State {
                queue: VecDeque::from([Job {
                    hash: root,
                    path_hint: path_hint.to_string(),
                    parent: None,
                }]),
                pending: HashMap::new(),
                ready: VecDeque::new(),
                fetching: 0,
                completing: 0,
                aborted: false,
                failure: None,
                root_found: true,
            }),
            work_available: Condvar::new(),
            ready_available: Condvar::new(),
            space_available: Condvar::new(),
            ready_bound: self.workers * 4,
        };

        let mut visit_failure = None;
        std::thread::scope(|scope| {
            for _ in 0..self.workers {
                scope.spawn(|| worker(&shared));
            }

            loop {
                let next = {
                    let mut state = shared.state.lock();
                    loop {
                        if let Some(catalog) = state.ready.pop_front() {
                            shared.space_available.notify_all();
                            break Some(catalog);
                        }
                        if state.aborted || state.drained() {
                            break None;
                        }
                        shared.ready_available.wait(&mut state);
                    }
                };
                let Some(catalog) = next else { break };
                if let Err(err) = visit(&catalog) {
                    visit_failure = Some(err);
                    let mut state = shared.state.lock();
                    state.aborted = true;
                    shared.work_available.notify_all();
                    shared.space_available.notify_all();
                    break;
                }
            }
        });

        if let Some(err) = visit_failure {
            return Err(err);
        }
        let mut state = shared.state.lock();
        if let Some(err) = state.failure.take() {
            return Err(err);
        }
        Ok(state.root_found)
    }
}

fn worker(shared: &Shared<'_>) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if state.aborted {
                    return;
                }
                if let Some(job) = state.queue.pop_front() {
                    state.fetching += 1;
                    break job;
                }
                if state.drained() {
                    shared.work_available.notify_all();
                    shared.ready_available.notify_all();
                    return;
                }
                shared.work_available.wait(&mut state);
            }
        };

        let fetched = shared.ctx.fetcher.catalog(&job.hash, &job.path_hint);

        let mut state = shared.state.lock();
        state.fetching -= 1;
        match fetched {
            Err(err) => {
                state.aborted = true;
                if state.failure.is_none() {
                    state.failure = Some(err);
                }
                shared.work_available.notify_all();
                shared.ready_available.notify_all();
                shared.space_available.notify_all();
                return;
            }
            Ok(None) => {
                warn!(hash = %job.hash, "catalog not found, pruning subtree");
                shared.ctx.missing.insert(job.hash);
                if job.parent.is_none() {
                    state.root_found = false;
                }
                if !finish_child(shared, &mut state, job.parent) {
                    return;
                }
            }
            Ok(Some(catalog)) => {
                let mut claimed = 0usize;
                for &child in &catalog.nested {
                    if shared.ctx.visited.insert(child) {
                        state.queue.push_back(Job {
                            hash: child,
                            path_hint: catalog.root_path.clone(),
                            parent: Some(job.hash),
                        });
                        claimed += 1;
                    }
                }
                if claimed == 0 {
                    if !complete(shared, &mut state, catalog, job.parent) {
                        return;
                    }
                } else {
                    state.pending.insert(
                        job.hash,
                        Pending {
                            catalog,
                            missing_children: claimed,
                            parent: job.parent,
                        },
                    );
                    shared.work_available.notify_all();
                }
            }
        }
    }
}

/// Pushes a completed catalog to the ready queue (suspending while the
/// visitor lags behind the back-pressure bound) and bubbles completion up
/// the pending chain. Returns false on abort.
fn complete(
    shared: &Shared<'_>,
    state: &mut MutexGuard<'_, State>,
    mut catalog: Catalog,
    mut parent: Option<ObjectHash>,
) -> bool {
    state.completing += 1;
    loop {
        while state.ready.len() >= shared.ready_bound && !state.aborted {
            shared.space_available.wait(state);
        }
        if state.aborted {
            state.completing -= 1;
            return false;
        }
        state.ready.push_back(catalog);
        shared.ready_available.notify_one();

        let Some(parent_hash) = parent else {
            state.completing -= 1;
            shared.work_available.notify_all();
            shared.ready_available.notify_all();
            return true;
        };
        let done = {
            let node = state
                .pending
                .get_mut(&parent_hash)
                .expect("completed catalog has a pending parent");
            node.missing_children -= 1;
            node.missing_children == 0
        };
        if !done {
            state.completing -= 1;
            shared.work_available.notify_all();
            return true;
        }
        let node = state.pending.remove(&parent_hash).expect("pending parent");
        catalog = node.catalog;
        parent = node.parent;
    }
}

/// Records that a child job ended without yielding (pruned subtree) and
/// completes the parent if it was the last one. Returns false on abort.
fn finish_child(
    shared: &Shared<'_>,
    state: &mut MutexGuard<'_, State>,
    parent: Option<ObjectHash>,
) -> bool {
    let Some(parent_hash) = parent else {
        shared.work_available.notify_all();
        return true;
    };
    let done = {
        let node = state
            .pending
            .get_mut(&parent_hash)
            .expect("skipped catalog has a pending parent");
        node.missing_children -= 1;
        node.missing_children == 0
    };
    if !done {
        shared.work_available.notify_all();
        return true;
    }
    let node = state.pending.remove(&parent_hash).expect("pending parent");
    complete(shared, state, node.catalog, node.parent)
}
