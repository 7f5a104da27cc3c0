//! Dominator tree and retained sizes
//!
//! The dominator tree is the authoritative structure for retained-size
//! work: an object's retained size is its shallow size plus the retained
//! sizes of the objects it immediately dominates.

mod lengauer_tarjan;
mod retained;

pub use lengauer_tarjan::{DominatorOutcome, LengauerTarjanBuilder};
pub use retained::{RetainedSizeCalculator, RetainedStats};

use rustc_hash::{FxHashMap, FxHashSet};

/// Immediate-dominator relation over the reachable object graph
///
/// Virtual-root entries are stripped: objects dominated directly by the
/// virtual root appear in `top_level` and have no `immediate_dominator`
/// entry. Unreachable objects appear nowhere.
#[derive(Debug, Clone, Default)]
pub struct DominatorTree {
    /// object address -> address of its immediate dominator
    pub immediate_dominator: FxHashMap<u64, u64>,

    /// dominator address -> addresses it immediately dominates
    pub dominator_children: FxHashMap<u64, Vec<u64>>,

    /// Reachable objects whose immediate dominator is the virtual root
    pub top_level: Vec<u64>,

    reachable: FxHashSet<u64>,
}

impl DominatorTree {
    #[inline]
    pub fn idom(&self, address: u64) -> Option<u64> {
        self.immediate_dominator.get(&address).copied()
    }

    #[inline]
    pub fn children(&self, address: u64) -> &[u64] {
        self.dominator_children
            .get(&address)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn is_reachable(&self, address: u64) -> bool {
        self.reachable.contains(&address)
    }

    #[inline]
    pub fn reachable_count(&self) -> usize {
        self.reachable.len()
    }

    pub(crate) fn mark_reachable(&mut self, address: u64) {
        self.reachable.insert(address);
    }
}
