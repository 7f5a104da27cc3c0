//! Statistics and report models returned by the query surface
//!
//! All values are plain data. Type names are rendered to owned strings so
//! reports can outlive the snapshot that produced them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Honesty flags describing how trustworthy the analysis results are
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFlags {
    /// Dominator tree was skipped or failed; retained sizes equal shallow
    /// sizes
    pub retained_is_approximate: bool,

    /// Roots came from the zero-incoming-reference heuristic, not the
    /// runtime
    pub roots_via_refcount: bool,

    /// References dropped by the per-object cap at ingestion. Any non-zero
    /// value means the dominator relation is an over-approximation.
    pub references_truncated_count: u64,
}

impl AnalysisFlags {
    /// Whether consumers should downgrade confidence in retained sizes
    pub fn is_approximate(&self) -> bool {
        self.retained_is_approximate || self.roots_via_refcount || self.references_truncated_count > 0
    }
}

/// Compact row for largest-object listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargestObject {
    pub address: u64,
    pub type_name: String,
    pub shallow_size: u64,
    pub retained_size: u64,
    pub generation: u32,
}

/// Per-type aggregate statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeStatistics {
    pub type_name: String,
    pub instance_count: usize,
    pub total_size: u64,
    pub total_retained_size: u64,
    pub avg_size: f64,
    /// generation -> instance count
    pub generation_distribution: BTreeMap<u32, usize>,
    pub largest: Vec<LargestObject>,
}

/// Per-generation rollup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStatistics {
    pub generation: u32,
    pub object_count: usize,
    pub total_size: u64,
    pub total_retained_size: u64,
}

/// Nominal type-hierarchy rollup, grouped by simplified base name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyStats {
    pub base_name: String,
    pub direct_instances: usize,
    pub total_instances_including_derived: usize,
    pub direct_size: u64,
    pub total_size_including_derived: u64,
    pub derived_types: Vec<String>,
}

/// Lightweight per-object reference summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceStats {
    pub address: u64,
    pub outgoing_count: usize,
    pub incoming_count: usize,
    /// BFS layer from source-less objects; an ordering guide, not a
    /// dominator depth
    pub reference_depth: Option<u32>,
    pub is_likely_root: bool,
    pub is_highly_referenced: bool,
}

/// Immutable analysis report for one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapAnalysisReport {
    pub snapshot_time: DateTime<Utc>,
    pub process_id: u32,
    pub total_objects: usize,
    pub total_memory: u64,
    /// Ordered by descending total retained size
    pub type_statistics: Vec<TypeStatistics>,
    /// Ordered by generation
    pub generation_statistics: Vec<GenerationStatistics>,
    /// Top objects by retained size
    pub largest_objects: Vec<LargestObject>,
    pub flags: AnalysisFlags,
}
