//! Analysis configuration
//!
//! Two-tier configuration: a `Preset` one-liner for the common case, and
//! field-level overrides for callers that need them. `validate()` performs
//! range checks with hints so misconfiguration fails early instead of deep
//! inside an analysis pass.

use serde::{Deserialize, Serialize};

use crate::errors::{HeapGraphError, Result};

/// Configuration preset tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// Small caps, quick answers on large dumps
    Fast,
    /// Default tier
    Balanced,
    /// Raised caps for exhaustive offline analysis
    Thorough,
}

/// Tunable bounds for ingestion, analysis, and queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Per-object cap on outbound references kept at ingestion.
    /// Truncation is counted and surfaced in the report.
    pub max_references_per_object: usize,

    /// Node cap for dominator-tree construction (virtual root included).
    /// Above this the tree is skipped and retained sizes fall back to
    /// shallow sizes. The DFS is iterative, so this is a memory and latency
    /// bound rather than a stack bound.
    pub max_dominator_nodes: usize,

    /// Minimum objects seen before the skip-ratio abort is evaluated
    pub early_abort_min_objects: u64,

    /// Ingestion aborts when skipped > ratio * processed
    pub early_abort_skip_ratio: u64,

    /// Progress is reported every this many ingested objects
    pub progress_interval: u64,

    /// Objects per address bucket in the spatial index
    pub address_bucket_capacity: usize,

    /// Incoming-reference count above which an object is flagged as highly
    /// referenced
    pub highly_referenced_threshold: usize,

    /// Number of objects in the report's largest-by-retained listing
    pub largest_objects_count: usize,

    /// Number of largest instances kept per type in type statistics
    pub per_type_largest_count: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::preset(Preset::Balanced)
    }
}

impl AnalysisConfig {
    /// Build a configuration from a preset tier
    pub fn preset(preset: Preset) -> Self {
        let base = Self {
            max_references_per_object: 100,
            max_dominator_nodes: 500_000,
            early_abort_min_objects: 1_000,
            early_abort_skip_ratio: 2,
            progress_interval: 25_000,
            address_bucket_capacity: 1_000,
            highly_referenced_threshold: 10,
            largest_objects_count: 50,
            per_type_largest_count: 10,
        };

        match preset {
            Preset::Fast => Self {
                max_references_per_object: 64,
                max_dominator_nodes: 100_000,
                largest_objects_count: 20,
                ..base
            },
            Preset::Balanced => base,
            Preset::Thorough => Self {
                max_dominator_nodes: 2_000_000,
                ..base
            },
        }
    }

    /// Validate ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_references_per_object == 0 || self.max_references_per_object > 10_000 {
            return Err(HeapGraphError::config_range(
                "max_references_per_object",
                self.max_references_per_object,
                1,
                10_000,
                "reference cap bounds per-object work",
            ));
        }

        if self.max_dominator_nodes == 0 || self.max_dominator_nodes > 10_000_000 {
            return Err(HeapGraphError::config_range(
                "max_dominator_nodes",
                self.max_dominator_nodes,
                1,
                10_000_000,
                "dominator arrays are dense in node count",
            ));
        }

        if self.address_bucket_capacity == 0 {
            return Err(HeapGraphError::config_range(
                "address_bucket_capacity",
                self.address_bucket_capacity,
                1,
                usize::MAX,
                "bucket capacity must be positive",
            ));
        }

        if self.progress_interval == 0 {
            return Err(HeapGraphError::config_range(
                "progress_interval",
                self.progress_interval as usize,
                1,
                usize::MAX,
                "interval divides the processed count",
            ));
        }

        if self.early_abort_skip_ratio == 0 {
            return Err(HeapGraphError::config_range(
                "early_abort_skip_ratio",
                self.early_abort_skip_ratio as usize,
                1,
                usize::MAX,
                "a zero ratio would abort on the first skipped object",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_balanced() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_references_per_object, 100);
        assert_eq!(config.max_dominator_nodes, 500_000);
        assert_eq!(config.progress_interval, 25_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough] {
            assert!(AnalysisConfig::preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn test_fast_preset_lowers_caps() {
        let fast = AnalysisConfig::preset(Preset::Fast);
        let balanced = AnalysisConfig::preset(Preset::Balanced);
        assert!(fast.max_dominator_nodes < balanced.max_dominator_nodes);
        assert!(fast.max_references_per_object < balanced.max_references_per_object);
    }

    #[test]
    fn test_invalid_reference_cap_rejected() {
        let mut config = AnalysisConfig::default();
        config.max_references_per_object = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_node_cap_rejected() {
        let mut config = AnalysisConfig::default();
        config.max_dominator_nodes = 20_000_000;
        assert!(config.validate().is_err());
    }
}
