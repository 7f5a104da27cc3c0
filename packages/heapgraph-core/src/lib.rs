/*
 * heapgraph-core - Post-mortem heap analysis engine
 *
 * Feature-first layout:
 * - shared/   : Common models (HeapObject, references, roots, reports)
 * - features/ : Vertical slices (snapshot -> roots -> dominator -> query)
 * - config/   : Analysis caps and presets
 *
 * Data flow:
 *   HeapSource -> HeapSnapshot (objects, type index) -> root set
 *     -> dominator tree (Lengauer-Tarjan) -> retained sizes -> queries
 *
 * Spatial, hierarchy, and reference-graph indices are built lazily on
 * first use from the populated snapshot.
 */

#![allow(clippy::new_without_default)] // constructors take required context
#![allow(clippy::collapsible_if)] // readability over brevity

/// Shared models and utilities
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{AnalysisConfig, Preset};
pub use errors::{HeapGraphError, Result};

pub use shared::interner::{InternedString, InternerStats, StringInterner};
pub use shared::models::{
    AnalysisFlags, GcRootPath, GenerationStatistics, HeapAnalysisReport, HeapObject,
    HierarchyStats, LargestObject, ObjectReference, ReferenceStats, RootKind, TypeStatistics,
};

pub use features::analysis::{AnalysisOutcome, HeapAnalyzer};
pub use features::dominator::{
    DominatorOutcome, DominatorTree, LengauerTarjanBuilder, RetainedSizeCalculator,
};
pub use features::hierarchy::{strip_generics_and_arrays, TypeHierarchyIndex};
pub use features::lazy_scan::LazyTypeScanner;
pub use features::query::HeapQuery;
pub use features::refgraph::ReferenceGraphIndex;
pub use features::reporting::ReportGenerator;
pub use features::roots::{RootDiscovery, RootDiscoverySummary};
pub use features::snapshot::ingest::{IngestProgress, IngestStats, Ingestor};
pub use features::snapshot::source::{
    HeapSource, RawHeapObject, RawReference, RawRoot, SourceError, VecHeapSource,
};
pub use features::snapshot::{HeapSnapshot, RootProvenance};
pub use features::spatial::{SizeClass, SpatialIndex};
