//! Reference-graph index
//!
//! Precomputed outgoing and incoming adjacency over tracked objects, plus
//! BFS-based reachability, shortest reference paths, and the reference-depth
//! layering. Reference depth is a BFS distance from source-less objects; it
//! is an inexpensive ordering guide for consumers and never replaces the
//! dominator tree.

use std::collections::VecDeque;

use ahash::AHashMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::AnalysisConfig;
use crate::features::snapshot::HeapSnapshot;
use crate::shared::models::ReferenceStats;

/// Adjacency maps and derived per-object metrics
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraphIndex {
    /// source -> tracked targets, in reference order
    outgoing: AHashMap<u64, Vec<u64>>,
    /// target -> tracked sources, in discovery order
    incoming: AHashMap<u64, Vec<u64>>,
    /// BFS layer from in-degree-zero objects
    depth: FxHashMap<u64, u32>,
}

impl ReferenceGraphIndex {
    pub fn build(snapshot: &HeapSnapshot) -> Self {
        let mut outgoing: AHashMap<u64, Vec<u64>> = AHashMap::with_capacity(snapshot.len());
        let mut incoming: AHashMap<u64, Vec<u64>> = AHashMap::with_capacity(snapshot.len());

        for object in snapshot.objects() {
            for reference in &object.references {
                if !snapshot.contains(reference.target_address) {
                    continue; // dangling edge
                }
                outgoing
                    .entry(object.address)
                    .or_default()
                    .push(reference.target_address);
                incoming
                    .entry(reference.target_address)
                    .or_default()
                    .push(object.address);
            }
        }

        let depth = Self::layer_depths(snapshot, &outgoing, &incoming);

        Self {
            outgoing,
            incoming,
            depth,
        }
    }

    /// Multi-source BFS seeded from objects with no incoming edges
    fn layer_depths(
        snapshot: &HeapSnapshot,
        outgoing: &AHashMap<u64, Vec<u64>>,
        incoming: &AHashMap<u64, Vec<u64>>,
    ) -> FxHashMap<u64, u32> {
        let mut depth: FxHashMap<u64, u32> =
            FxHashMap::with_capacity_and_hasher(snapshot.len(), Default::default());
        let mut queue: VecDeque<u64> = VecDeque::new();

        for object in snapshot.objects() {
            if !incoming.contains_key(&object.address) {
                depth.insert(object.address, 0);
                queue.push_back(object.address);
            }
        }

        while let Some(current) = queue.pop_front() {
            let next_depth = depth[&current] + 1;
            for &target in outgoing.get(&current).map(|v| v.as_slice()).unwrap_or(&[]) {
                if !depth.contains_key(&target) {
                    depth.insert(target, next_depth);
                    queue.push_back(target);
                }
            }
        }

        depth
    }

    #[inline]
    pub fn outgoing_targets(&self, address: u64) -> &[u64] {
        self.outgoing
            .get(&address)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn incoming_sources(&self, address: u64) -> &[u64] {
        self.incoming
            .get(&address)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn outgoing_count(&self, address: u64) -> usize {
        self.outgoing_targets(address).len()
    }

    #[inline]
    pub fn incoming_count(&self, address: u64) -> usize {
        self.incoming_sources(address).len()
    }

    /// Shortest-path layer from any source-less object, when reachable from
    /// one
    #[inline]
    pub fn reference_depth(&self, address: u64) -> Option<u32> {
        self.depth.get(&address).copied()
    }

    /// Tracked objects reachable from `start` within `max_depth` edges,
    /// yielded in breadth-first depth order starting with `start` itself
    pub fn reachable(&self, snapshot: &HeapSnapshot, start: u64, max_depth: u32) -> Vec<u64> {
        if !snapshot.contains(start) {
            return Vec::new();
        }

        let mut visited: FxHashSet<u64> = FxHashSet::default();
        let mut queue: VecDeque<(u64, u32)> = VecDeque::new();
        let mut out = Vec::new();

        visited.insert(start);
        queue.push_back((start, 0));

        while let Some((current, d)) = queue.pop_front() {
            out.push(current);
            if d == max_depth {
                continue;
            }
            for &target in self.outgoing_targets(current) {
                if visited.insert(target) {
                    queue.push_back((target, d + 1));
                }
            }
        }

        out
    }

    /// Shortest reference path from `from` to `to`, inclusive of both ends.
    /// Empty when either endpoint is untracked or no path exists;
    /// `[from]` when the endpoints coincide.
    pub fn shortest_path(&self, snapshot: &HeapSnapshot, from: u64, to: u64) -> Vec<u64> {
        if !snapshot.contains(from) || !snapshot.contains(to) {
            return Vec::new();
        }
        if from == to {
            return vec![from];
        }

        let mut parent: FxHashMap<u64, u64> = FxHashMap::default();
        let mut visited: FxHashSet<u64> = FxHashSet::default();
        let mut queue: VecDeque<u64> = VecDeque::new();

        visited.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for &target in self.outgoing_targets(current) {
                if !visited.insert(target) {
                    continue;
                }
                parent.insert(target, current);
                if target == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(&p) = parent.get(&cursor) {
                        path.push(p);
                        cursor = p;
                    }
                    path.reverse();
                    return path;
                }
                queue.push_back(target);
            }
        }

        Vec::new()
    }

    /// Lightweight per-object reference summary
    pub fn reference_stats(
        &self,
        snapshot: &HeapSnapshot,
        config: &AnalysisConfig,
        address: u64,
    ) -> Option<ReferenceStats> {
        if !snapshot.contains(address) {
            return None;
        }

        let incoming_count = self.incoming_count(address);
        Some(ReferenceStats {
            address,
            outgoing_count: self.outgoing_count(address),
            incoming_count,
            reference_depth: self.reference_depth(address),
            is_likely_root: incoming_count == 0 || snapshot.is_root(address),
            is_highly_referenced: incoming_count > config.highly_referenced_threshold,
        })
    }

    /// Incoming referencers that sit on a strictly shallower BFS layer.
    /// A cheap stand-in for dominator queries in interactive listings; the
    /// dominator tree remains authoritative.
    pub fn potential_dominators(&self, address: u64) -> Vec<u64> {
        let Some(own_depth) = self.reference_depth(address) else {
            return Vec::new();
        };
        let mut out: Vec<u64> = self
            .incoming_sources(address)
            .iter()
            .copied()
            .filter(|&src| {
                self.reference_depth(src)
                    .map(|d| d < own_depth)
                    .unwrap_or(false)
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
