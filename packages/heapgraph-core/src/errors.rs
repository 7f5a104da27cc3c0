//! Error types for heapgraph-core
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

/// Main error type for heap analysis operations
#[derive(Debug, Error)]
pub enum HeapGraphError {
    /// Source-level failure while scanning a dump
    #[error("Source error: {0}")]
    Source(String),

    /// Ingestion aborted because the dump looks corrupt
    #[error("Corrupt dump: {skipped} skipped vs {processed} processed objects")]
    CorruptDump { processed: u64, skipped: u64 },

    /// Analysis error (dominator construction, retained-size aggregation)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Configuration value outside its accepted range
    #[error("Configuration error: {field} = {value} outside [{min}, {max}] ({hint})")]
    ConfigRange {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
        hint: &'static str,
    },

    /// Internal map inconsistency; indicates a programming error
    #[error("Snapshot inconsistency: {0}")]
    Inconsistency(String),
}

impl HeapGraphError {
    /// Create a source error
    pub fn source(msg: impl Into<String>) -> Self {
        HeapGraphError::Source(msg.into())
    }

    /// Create an analysis error
    pub fn analysis(msg: impl Into<String>) -> Self {
        HeapGraphError::Analysis(msg.into())
    }

    /// Create a ranged configuration error with a hint
    pub fn config_range(
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
        hint: &'static str,
    ) -> Self {
        HeapGraphError::ConfigRange {
            field,
            value,
            min,
            max,
            hint,
        }
    }
}

/// Result type alias for heap analysis operations
pub type Result<T> = std::result::Result<T, HeapGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HeapGraphError::CorruptDump {
            processed: 10,
            skipped: 25,
        };
        assert_eq!(
            err.to_string(),
            "Corrupt dump: 25 skipped vs 10 processed objects"
        );
    }

    #[test]
    fn test_config_range_display() {
        let err = HeapGraphError::config_range("max_dominator_nodes", 0, 1, 10_000_000, "cap must be positive");
        assert!(err.to_string().contains("max_dominator_nodes"));
        assert!(err.to_string().contains("cap must be positive"));
    }
}
