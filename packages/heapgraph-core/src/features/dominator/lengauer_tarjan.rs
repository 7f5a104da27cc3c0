//! Lengauer–Tarjan immediate dominators
//!
//! Computes `idom(v)` for every object reachable from the root set, over
//! the graph formed by tracked objects, their filtered references, and a
//! virtual root with an edge to every discovered root. The virtual root
//! makes the computation single-source; without it a forest of roots would
//! require a union of dominator trees.
//!
//! Node labeling: dense indices in `[0, N)`, with **node 0 as the virtual
//! root** and objects taking `1..N` in object-map order. Both directions of
//! the mapping (`address -> node`, `node -> address`) are kept for result
//! assembly.
//!
//! The DFS and the EVAL path compression are iterative, so graph depth
//! never touches the thread stack. EVAL additionally guards against cycles
//! in the ancestor chain: corrupt input must degrade to an analysis error,
//! not an infinite loop.
//!
//! # References
//! - Lengauer, T. and Tarjan, R. E. "A Fast Algorithm for Finding
//!   Dominators in a Flowgraph" (TOPLAS 1979)

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use super::DominatorTree;
use crate::config::AnalysisConfig;
use crate::errors::{HeapGraphError, Result};
use crate::features::snapshot::HeapSnapshot;

const NONE: usize = usize::MAX;

/// Result of one construction attempt
#[derive(Debug)]
pub enum DominatorOutcome {
    Built(DominatorTree),
    /// Graph exceeded the node cap; retained sizes fall back to shallow
    SkippedTooLarge { node_count: usize },
}

/// Builds the dominator tree of the virtual-root-extended object graph
pub struct LengauerTarjanBuilder<'a> {
    snapshot: &'a HeapSnapshot,
    config: &'a AnalysisConfig,
}

/// Dense working arrays, indexed by node id
struct LtState {
    /// node -> DFS number, NONE when unreached
    dfnum: Vec<usize>,
    /// DFS number -> node
    vertex: Vec<usize>,
    /// node -> DFS tree parent
    parent: Vec<usize>,
    /// node -> semidominator, in DFS-number space
    semi: Vec<usize>,
    /// node -> forest ancestor (NONE when the node is a forest root)
    ancestor: Vec<usize>,
    /// node -> node with minimal semidominator on the forest path
    label: Vec<usize>,
    /// node -> immediate dominator
    idom: Vec<usize>,
    /// semidominator candidate buckets, keyed by node
    bucket: Vec<Vec<usize>>,
}

impl LtState {
    fn new(node_count: usize) -> Self {
        Self {
            dfnum: vec![NONE; node_count],
            vertex: Vec::with_capacity(node_count),
            parent: vec![NONE; node_count],
            semi: vec![NONE; node_count],
            ancestor: vec![NONE; node_count],
            label: (0..node_count).collect(),
            idom: vec![NONE; node_count],
            bucket: vec![Vec::new(); node_count],
        }
    }

    /// EVAL with iterative path compression
    ///
    /// Returns the node with minimal semidominator number on the forest
    /// path from the forest root down to `v`.
    fn eval(&mut self, v: usize) -> usize {
        if self.ancestor[v] == NONE {
            return v;
        }
        self.compress(v);
        self.label[v]
    }

    fn compress(&mut self, v: usize) {
        // collect the chain whose grandparent exists, deepest node first
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut x = v;
        while self.ancestor[x] != NONE && self.ancestor[self.ancestor[x]] != NONE {
            // corrupt ancestor chains may cycle; stop on the first repeat
            if !seen.insert(x) {
                warn!("dominators: cycle detected in ancestor chain, stopping compression");
                break;
            }
            chain.push(x);
            x = self.ancestor[x];
        }

        // unwind top-down so each node sees a fully compressed ancestor
        for &x in chain.iter().rev() {
            let a = self.ancestor[x];
            if self.semi[self.label[a]] < self.semi[self.label[x]] {
                self.label[x] = self.label[a];
            }
            self.ancestor[x] = self.ancestor[a];
        }
    }

    #[inline]
    fn link(&mut self, parent: usize, child: usize) {
        self.ancestor[child] = parent;
    }
}

impl<'a> LengauerTarjanBuilder<'a> {
    pub fn new(snapshot: &'a HeapSnapshot, config: &'a AnalysisConfig) -> Self {
        Self { snapshot, config }
    }

    /// Build the dominator tree, or skip when the graph exceeds the cap
    pub fn build(&self) -> Result<DominatorOutcome> {
        let node_count = self.snapshot.len() + 1;
        if node_count > self.config.max_dominator_nodes {
            warn!(
                "dominators: {} nodes exceeds cap {}, skipping",
                node_count, self.config.max_dominator_nodes
            );
            return Ok(DominatorOutcome::SkippedTooLarge { node_count });
        }

        // -- node labeling -------------------------------------------------
        let mut node_to_addr: Vec<u64> = Vec::with_capacity(node_count);
        node_to_addr.push(0); // virtual root sentinel
        let mut addr_to_node: FxHashMap<u64, usize> =
            FxHashMap::with_capacity_and_hasher(self.snapshot.len(), Default::default());
        for address in self.snapshot.addresses() {
            addr_to_node.insert(address, node_to_addr.len());
            node_to_addr.push(address);
        }

        // -- adjacency: virtual root -> roots, object -> tracked targets ---
        let mut succ: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut pred: Vec<Vec<usize>> = vec![Vec::new(); node_count];

        for &root in self.snapshot.roots() {
            if let Some(&v) = addr_to_node.get(&root) {
                succ[0].push(v);
                pred[v].push(0);
            }
        }
        for object in self.snapshot.objects() {
            let u = addr_to_node[&object.address];
            for reference in &object.references {
                if let Some(&v) = addr_to_node.get(&reference.target_address) {
                    succ[u].push(v);
                    pred[v].push(u);
                }
            }
        }

        // -- iterative DFS from the virtual root ---------------------------
        let mut state = LtState::new(node_count);
        let mut stack: Vec<(usize, usize)> = vec![(0, NONE)];
        while let Some((v, p)) = stack.pop() {
            if state.dfnum[v] != NONE {
                continue;
            }
            state.dfnum[v] = state.vertex.len();
            state.vertex.push(v);
            state.parent[v] = p;
            state.semi[v] = state.dfnum[v];
            for &w in &succ[v] {
                if state.dfnum[w] == NONE {
                    stack.push((w, v));
                }
            }
        }

        let reached = state.vertex.len();
        debug!(
            "dominators: {} of {} nodes reachable from {} roots",
            reached - 1,
            node_count - 1,
            self.snapshot.roots().len()
        );

        // -- semidominators and buckets, in reverse DFS order ---------------
        for i in (1..reached).rev() {
            let w = state.vertex[i];

            for &v in &pred[w] {
                if state.dfnum[v] == NONE {
                    continue; // predecessor itself unreachable
                }
                let u = state.eval(v);
                if state.semi[u] < state.semi[w] {
                    state.semi[w] = state.semi[u];
                }
            }

            let semi_vertex = state.vertex[state.semi[w]];
            state.bucket[semi_vertex].push(w);

            let p = state.parent[w];
            state.link(p, w);

            for v in std::mem::take(&mut state.bucket[p]) {
                let u = state.eval(v);
                state.idom[v] = if state.semi[u] < state.semi[v] { u } else { p };
            }
        }

        // -- final pass: resolve relative dominators ------------------------
        for i in 1..reached {
            let w = state.vertex[i];
            if state.idom[w] == NONE {
                return Err(HeapGraphError::analysis(format!(
                    "no dominator resolved for node {}",
                    w
                )));
            }
            if state.idom[w] != state.vertex[state.semi[w]] {
                state.idom[w] = state.idom[state.idom[w]];
            }
        }
        state.idom[0] = 0;

        Ok(DominatorOutcome::Built(Self::assemble(
            &state,
            &node_to_addr,
            reached,
        )))
    }

    /// Translate node-space results back to addresses, stripping the
    /// virtual root. Child lists are deduplicated defensively: the classical
    /// algorithm produces none, but the cycle-guarded EVAL can on corrupt
    /// input.
    fn assemble(state: &LtState, node_to_addr: &[u64], reached: usize) -> DominatorTree {
        let mut tree = DominatorTree::default();
        let mut child_seen: FxHashSet<(u64, u64)> = FxHashSet::default();

        for i in 1..reached {
            let w = state.vertex[i];
            let address = node_to_addr[w];
            tree.mark_reachable(address);

            let d = state.idom[w];
            if d == 0 {
                tree.top_level.push(address);
            } else {
                let dominator = node_to_addr[d];
                tree.immediate_dominator.insert(address, dominator);
                if child_seen.insert((dominator, address)) {
                    tree.dominator_children
                        .entry(dominator)
                        .or_default()
                        .push(address);
                }
            }
        }

        tree
    }
}
