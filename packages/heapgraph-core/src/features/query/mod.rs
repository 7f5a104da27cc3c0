//! Query facade
//!
//! One read-only surface over the snapshot and its lazily built indices.
//! Unknown addresses and types produce empty results, never errors: a
//! post-mortem console asking about a stale address should get an empty
//! answer, not a failure.

use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::features::hierarchy::TypeHierarchyIndex;
use crate::features::reporting::ReportGenerator;
use crate::features::snapshot::HeapSnapshot;
use crate::shared::models::{
    HeapAnalysisReport, HeapObject, HierarchyStats, ObjectReference, ReferenceStats,
    TypeStatistics,
};

/// Read-only queries over an ingested snapshot
pub struct HeapQuery<'a> {
    snapshot: &'a HeapSnapshot,
    config: &'a AnalysisConfig,
}

impl<'a> HeapQuery<'a> {
    pub fn new(snapshot: &'a HeapSnapshot, config: &'a AnalysisConfig) -> Self {
        Self { snapshot, config }
    }

    /// Object at an exact address
    #[inline]
    pub fn get(&self, address: u64) -> Option<&'a HeapObject> {
        self.snapshot.get(address)
    }

    /// Objects of one exact type, in insertion order
    pub fn by_type(&self, type_name: &str) -> impl Iterator<Item = &'a HeapObject> + '_ {
        self.snapshot
            .addresses_of_type(type_name)
            .iter()
            .filter_map(move |&address| self.snapshot.get(address))
    }

    /// Aggregate statistics for one exact type
    pub fn type_statistics(&self, type_name: &str) -> Option<TypeStatistics> {
        ReportGenerator::new(self.config).statistics_for_type(self.snapshot, type_name)
    }

    /// Nominal rollup across generic instantiations and nested types
    pub fn hierarchy_stats(&self, type_name: &str) -> HierarchyStats {
        self.hierarchy().hierarchy_stats(self.snapshot, type_name)
    }

    /// References stored in the object at `address`
    pub fn outgoing_references(&self, address: u64) -> Vec<ObjectReference> {
        self.snapshot
            .get(address)
            .map(|o| o.references.clone())
            .unwrap_or_default()
    }

    /// References from tracked objects into `address`
    ///
    /// Served from the reference-graph index when a prior query already
    /// built it; otherwise answered with a full scan so one lookup does not
    /// force index construction.
    pub fn incoming_references(&self, address: u64) -> Vec<ObjectReference> {
        if let Some(graph) = self.snapshot.reference_graph_if_built() {
            return graph
                .incoming_sources(address)
                .iter()
                .filter_map(|&src| self.snapshot.get(src))
                .flat_map(|o| o.references_to(address).cloned().collect::<Vec<_>>())
                .collect();
        }

        self.snapshot
            .objects()
            .flat_map(|o| o.references_to(address).cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Objects with shallow size in `[lo, hi]`, ascending by address
    pub fn size_range(&self, lo: u64, hi: u64) -> Vec<&'a HeapObject> {
        self.resolve(self.snapshot.spatial_index(self.config).size_range(lo, hi))
    }

    /// Objects within `prox` bytes of `address`, ascending by address
    pub fn nearby(&self, address: u64, prox: u64) -> Vec<&'a HeapObject> {
        self.resolve(self.snapshot.spatial_index(self.config).nearby(address, prox))
    }

    /// Objects in the address interval `[lo, hi]`, ascending
    pub fn address_range(&self, lo: u64, hi: u64) -> Vec<&'a HeapObject> {
        self.resolve(self.snapshot.spatial_index(self.config).range(lo, hi))
    }

    /// Objects reachable from `address` within `max_depth` edges, in
    /// breadth-first order
    pub fn reachable(&self, address: u64, max_depth: u32) -> Vec<&'a HeapObject> {
        self.resolve(
            self.snapshot
                .reference_graph()
                .reachable(self.snapshot, address, max_depth),
        )
    }

    /// Shortest reference path between two objects, empty when unreachable
    pub fn shortest_path(&self, from: u64, to: u64) -> Vec<&'a HeapObject> {
        self.resolve(
            self.snapshot
                .reference_graph()
                .shortest_path(self.snapshot, from, to),
        )
    }

    /// Lightweight reference summary for one object
    pub fn reference_stats(&self, address: u64) -> Option<ReferenceStats> {
        self.snapshot
            .reference_graph()
            .reference_stats(self.snapshot, self.config, address)
    }

    /// Referencers likely to dominate `address`, by BFS layering. An
    /// approximation; the dominator tree is authoritative.
    pub fn potential_dominators(&self, address: u64) -> Vec<&'a HeapObject> {
        self.resolve(self.snapshot.reference_graph().potential_dominators(address))
    }

    /// Full analysis report
    pub fn report(&self) -> HeapAnalysisReport {
        ReportGenerator::new(self.config).generate(self.snapshot)
    }

    fn hierarchy(&self) -> Arc<TypeHierarchyIndex> {
        self.snapshot.hierarchy_index()
    }

    fn resolve(&self, addresses: Vec<u64>) -> Vec<&'a HeapObject> {
        addresses
            .into_iter()
            .filter_map(|address| self.snapshot.get(address))
            .collect()
    }
}
