//! Snapshot ingestion
//!
//! Drains a `HeapSource` into a `HeapSnapshot`, applying the skip rules and
//! per-object reference cap. One bad record never aborts the scan; a dump
//! that is mostly bad does, via the skip-ratio check.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::errors::{HeapGraphError, Result};
use crate::features::snapshot::source::{HeapSource, RawHeapObject};
use crate::features::snapshot::HeapSnapshot;
use crate::shared::models::{HeapObject, ObjectReference};

/// Counters returned by one ingestion pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    pub processed: u64,
    pub skipped: u64,
    pub truncated_references: u64,
    pub duration_ms: u64,
}

/// Periodic progress snapshot handed to the optional callback
#[derive(Debug, Clone, Copy)]
pub struct IngestProgress {
    pub processed: u64,
    pub skipped: u64,
}

/// Drains a source into a snapshot
pub struct Ingestor<'a> {
    config: &'a AnalysisConfig,
    progress: Option<Box<dyn FnMut(IngestProgress) + 'a>>,
}

impl<'a> Ingestor<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Install a progress hook, invoked every `config.progress_interval`
    /// processed objects
    pub fn with_progress(mut self, hook: impl FnMut(IngestProgress) + 'a) -> Self {
        self.progress = Some(Box::new(hook));
        self
    }

    /// Ingest every object the source yields
    ///
    /// Leaves the snapshot partially populated (and not analyzed) when the
    /// source fails wholesale or the dump trips the corruption heuristic.
    pub fn ingest<S: HeapSource>(
        &mut self,
        snapshot: &mut HeapSnapshot,
        source: &S,
    ) -> Result<IngestStats> {
        let start = Instant::now();
        let mut stats = IngestStats::default();

        for item in source.enumerate_objects() {
            let raw = match item {
                Ok(raw) => raw,
                Err(e) if !e.is_fatal() => {
                    warn!("ingest: {}", e);
                    stats.skipped += 1;
                    self.check_abort(&stats)?;
                    continue;
                }
                Err(e) => {
                    warn!("ingest: source failed after {} objects: {}", stats.processed, e);
                    return Err(HeapGraphError::source(e.to_string()));
                }
            };

            if !self.ingest_one(snapshot, raw, &mut stats) {
                stats.skipped += 1;
            } else {
                stats.processed += 1;
                if stats.processed % self.config.progress_interval == 0 {
                    info!(
                        "ingest: {} objects processed, {} skipped",
                        stats.processed, stats.skipped
                    );
                    if let Some(hook) = self.progress.as_mut() {
                        hook(IngestProgress {
                            processed: stats.processed,
                            skipped: stats.skipped,
                        });
                    }
                }
            }

            self.check_abort(&stats)?;
        }

        if !snapshot.is_empty() {
            snapshot.mark_analyzed();
        }
        snapshot.flags_mut().references_truncated_count += stats.truncated_references;

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "ingest: done, {} processed, {} skipped, {} references truncated in {}ms",
            stats.processed, stats.skipped, stats.truncated_references, stats.duration_ms
        );
        Ok(stats)
    }

    /// Returns false when the object fails validation
    fn ingest_one(
        &self,
        snapshot: &mut HeapSnapshot,
        raw: RawHeapObject,
        stats: &mut IngestStats,
    ) -> bool {
        if raw.address == 0 || raw.shallow_size == 0 || raw.type_name.is_empty() {
            debug!(
                "ingest: skipping object at {:#x} (size {}, type {:?})",
                raw.address, raw.shallow_size, raw.type_name
            );
            return false;
        }

        let type_name = snapshot.intern(&raw.type_name);
        let cap = self.config.max_references_per_object;

        let mut references = Vec::new();
        let mut kept = 0usize;
        for r in &raw.references {
            if r.target_address == 0 || r.target_type.is_empty() {
                continue;
            }
            if kept == cap {
                stats.truncated_references += 1;
                continue;
            }
            references.push(ObjectReference {
                source_address: raw.address,
                target_address: r.target_address,
                field_name: snapshot.intern(&r.field_name),
                target_type: snapshot.intern(&r.target_type),
            });
            kept += 1;
        }

        snapshot.insert_object(HeapObject::new(
            raw.address,
            type_name,
            raw.shallow_size,
            raw.generation,
            references,
        ));
        true
    }

    /// Corruption heuristic: far more skipped than processed once enough
    /// objects have been seen.
    fn check_abort(&self, stats: &IngestStats) -> Result<()> {
        let seen = stats.processed + stats.skipped;
        if seen >= self.config.early_abort_min_objects
            && stats.skipped > self.config.early_abort_skip_ratio * stats.processed
        {
            warn!(
                "ingest: aborting, {} skipped vs {} processed",
                stats.skipped, stats.processed
            );
            return Err(HeapGraphError::CorruptDump {
                processed: stats.processed,
                skipped: stats.skipped,
            });
        }
        Ok(())
    }
}
