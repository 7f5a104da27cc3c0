//! Retained-size aggregation
//!
//! `retained(v) = shallow(v) + sum of retained(c)` over the dominator-tree
//! children of `v`. Computed bottom-up with an explicit stack and a memo
//! map, then written back onto each object. Objects absent from the tree
//! (unreachable from every root) keep `retained = shallow`.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::DominatorTree;
use crate::errors::{HeapGraphError, Result};
use crate::features::snapshot::HeapSnapshot;

/// Counters from one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct RetainedStats {
    /// Objects annotated from the dominator tree
    pub annotated: usize,
    /// Shallow bytes reachable from the root set; equals the sum of
    /// retained sizes over top-level dominator trees
    pub reachable_bytes: u64,
}

pub struct RetainedSizeCalculator;

impl RetainedSizeCalculator {
    /// Aggregate retained sizes and write them onto the snapshot's objects
    ///
    /// Callers treat any error as a signal to fall back to shallow sizes
    /// globally.
    pub fn compute(snapshot: &mut HeapSnapshot, tree: &DominatorTree) -> Result<RetainedStats> {
        let mut memo: FxHashMap<u64, u64> =
            FxHashMap::with_capacity_and_hasher(tree.reachable_count(), Default::default());

        for &top in &tree.top_level {
            Self::accumulate(snapshot, tree, top, &mut memo)?;
        }

        let reachable_bytes = tree
            .top_level
            .iter()
            .filter_map(|addr| memo.get(addr))
            .sum();

        let mut annotated = 0usize;
        for object in snapshot.objects_mut() {
            match memo.get(&object.address) {
                Some(&retained) => {
                    object.retained_size = retained;
                    annotated += 1;
                }
                None => object.retained_size = object.shallow_size,
            }
        }

        debug!(
            "retained: annotated {} objects, {} reachable bytes",
            annotated, reachable_bytes
        );
        Ok(RetainedStats {
            annotated,
            reachable_bytes,
        })
    }

    /// Reset every object to `retained = shallow`
    pub fn reset_to_shallow(snapshot: &mut HeapSnapshot) {
        for object in snapshot.objects_mut() {
            object.retained_size = object.shallow_size;
        }
    }

    /// Post-order accumulation from one top-level tree
    fn accumulate(
        snapshot: &HeapSnapshot,
        tree: &DominatorTree,
        top: u64,
        memo: &mut FxHashMap<u64, u64>,
    ) -> Result<()> {
        let mut in_progress: FxHashSet<u64> = FxHashSet::default();
        let mut stack: Vec<(u64, bool)> = vec![(top, false)];

        while let Some((address, expanded)) = stack.pop() {
            if expanded {
                let shallow = snapshot
                    .get(address)
                    .map(|o| o.shallow_size)
                    .ok_or_else(|| {
                        HeapGraphError::Inconsistency(format!(
                            "dominator tree refers to untracked address {:#x}",
                            address
                        ))
                    })?;
                let children_sum: u64 = tree
                    .children(address)
                    .iter()
                    .filter_map(|c| memo.get(c))
                    .sum();
                memo.insert(address, shallow + children_sum);
                in_progress.remove(&address);
                continue;
            }

            if memo.contains_key(&address) {
                continue;
            }
            if !in_progress.insert(address) {
                return Err(HeapGraphError::analysis(format!(
                    "cycle in dominator children at {:#x}",
                    address
                )));
            }

            stack.push((address, true));
            for &child in tree.children(address) {
                if !memo.contains_key(&child) {
                    stack.push((child, false));
                }
            }
        }

        Ok(())
    }
}
