//! Full-analysis orchestration
//!
//! Runs root discovery, dominator construction, and retained-size
//! aggregation over a populated snapshot. Stage failures never abort the
//! pass: retained sizes degrade to shallow sizes and the outcome carries
//! the honesty flags consumers need to downgrade confidence.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::features::dominator::{
    DominatorOutcome, LengauerTarjanBuilder, RetainedSizeCalculator,
};
use crate::features::roots::RootDiscovery;
use crate::features::snapshot::source::HeapSource;
use crate::features::snapshot::HeapSnapshot;
use crate::shared::models::AnalysisFlags;

/// Result of one full analysis pass
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub flags: AnalysisFlags,
    pub root_count: usize,
    /// Objects covered by the dominator tree
    pub reachable_count: usize,
    pub duration_ms: u64,
    /// Structured stage warnings, in occurrence order
    pub warnings: Vec<String>,
}

/// Orchestrates roots -> dominators -> retained sizes
pub struct HeapAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> HeapAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analyze<S: HeapSource>(
        &self,
        snapshot: &mut HeapSnapshot,
        source: &S,
    ) -> AnalysisOutcome {
        let start = Instant::now();
        let mut warnings = Vec::new();

        let roots = RootDiscovery::discover(snapshot, source);
        if roots.via_refcount {
            warnings.push(format!(
                "roots approximated by reference counting ({} candidates)",
                roots.roots.len()
            ));
        }

        let mut reachable_count = 0usize;
        match LengauerTarjanBuilder::new(snapshot, self.config).build() {
            Ok(DominatorOutcome::Built(tree)) => {
                reachable_count = tree.reachable_count();
                match RetainedSizeCalculator::compute(snapshot, &tree) {
                    Ok(stats) => {
                        info!(
                            "analysis: {} reachable objects, {} reachable bytes",
                            stats.annotated, stats.reachable_bytes
                        );
                    }
                    Err(e) => {
                        warn!("analysis: retained-size aggregation failed: {}", e);
                        warnings.push(format!("retained sizes fell back to shallow: {}", e));
                        RetainedSizeCalculator::reset_to_shallow(snapshot);
                        snapshot.flags_mut().retained_is_approximate = true;
                    }
                }
                snapshot.set_dominators(Arc::new(tree));
            }
            Ok(DominatorOutcome::SkippedTooLarge { node_count }) => {
                warnings.push(format!(
                    "dominator tree skipped: {} nodes exceeds cap {}",
                    node_count, self.config.max_dominator_nodes
                ));
                RetainedSizeCalculator::reset_to_shallow(snapshot);
                snapshot.flags_mut().retained_is_approximate = true;
            }
            Err(e) => {
                warn!("analysis: dominator construction failed: {}", e);
                warnings.push(format!("dominator construction failed: {}", e));
                RetainedSizeCalculator::reset_to_shallow(snapshot);
                snapshot.flags_mut().retained_is_approximate = true;
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "analysis: done in {}ms ({} roots, {} reachable)",
            duration_ms,
            roots.roots.len(),
            reachable_count
        );

        AnalysisOutcome {
            flags: snapshot.flags(),
            root_count: roots.roots.len(),
            reachable_count,
            duration_ms,
            warnings,
        }
    }
}
