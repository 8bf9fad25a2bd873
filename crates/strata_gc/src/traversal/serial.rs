//! Single-threaded depth-first tree walker.

use super::{TreeWalker, VisitFn, WalkContext};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::hash::ObjectHash;
use tracing::warn;

/// Explicit-stack DFS; catalogs are yielded on the way back up.
pub(crate) struct SerialWalker;

enum Frame {
    Visit(ObjectHash, String),
    Yield(Catalog),
}

impl TreeWalker for SerialWalker {
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
        let Some(catalog) = ctx.fetcher.catalog(&root, path_hint)? else {
            warn!(hash = %root, "catalog not found, pruning subtree");
            ctx.missing.insert(root);
            return Ok(false);
        };

        let mut stack = Vec::new();
        push_frames(&mut stack, catalog);

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit(hash, hint) => {
                    if !ctx.visited.insert(hash) {
                        continue;
                    }
                    match ctx.fetcher.catalog(&hash, &hint)? {
                        Some(catalog) => push_frames(&mut stack, catalog),
                        None => {
                            warn!(hash = %hash, "catalog not found, pruning subtree");
                            ctx.missing.insert(hash);
                        }
                    }
                }
                Frame::Yield(catalog) => visit(&catalog)?,
            }
        }
        Ok(true)
    }
}

fn push_frames(stack: &mut Vec<Frame>, catalog: Catalog) {
    let hint = catalog.root_path.clone();
    let children = catalog.nested.clone();
    // the Yield frame sits below its children, so they pop first
    stack.push(Frame::Yield(catalog));
    for child in children {
        stack.push(Frame::Visit(child, hint.clone()));
    }
}
