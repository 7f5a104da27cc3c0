//! Report generation
//!
//! Aggregates a fully populated (and ideally analyzed) snapshot into an
//! immutable `HeapAnalysisReport`. Per-type rows are computed in parallel
//! and ordered by descending total retained size, the ordering consumers
//! triage leaks by.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::features::snapshot::HeapSnapshot;
use crate::shared::models::{
    GenerationStatistics, HeapAnalysisReport, HeapObject, LargestObject, TypeStatistics,
};

pub struct ReportGenerator<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, snapshot: &HeapSnapshot) -> HeapAnalysisReport {
        let type_statistics = self.type_statistics(snapshot);
        let generation_statistics = Self::generation_statistics(snapshot);
        let largest_objects = self.largest_objects(snapshot);

        debug!(
            "report: {} types, {} generations, {} largest entries",
            type_statistics.len(),
            generation_statistics.len(),
            largest_objects.len()
        );

        HeapAnalysisReport {
            snapshot_time: snapshot.captured_at(),
            process_id: snapshot.process_id(),
            total_objects: snapshot.len(),
            total_memory: snapshot.total_memory(),
            type_statistics,
            generation_statistics,
            largest_objects,
            flags: snapshot.flags(),
        }
    }

    /// Per-type statistics for one exact type, or None when the type is
    /// unknown to the snapshot
    pub fn statistics_for_type(
        &self,
        snapshot: &HeapSnapshot,
        type_name: &str,
    ) -> Option<TypeStatistics> {
        let addresses = snapshot.addresses_of_type(type_name);
        if addresses.is_empty() {
            return None;
        }
        Some(self.aggregate_type(snapshot, type_name, addresses))
    }

    fn type_statistics(&self, snapshot: &HeapSnapshot) -> Vec<TypeStatistics> {
        let entries: Vec<(&str, &[u64])> = snapshot
            .type_entries()
            .map(|(name, addresses)| (name.as_ref(), addresses.as_slice()))
            .collect();

        let mut stats: Vec<TypeStatistics> = entries
            .par_iter()
            .map(|&(name, addresses)| self.aggregate_type(snapshot, name, addresses))
            .collect();

        stats.sort_unstable_by(|a, b| {
            b.total_retained_size
                .cmp(&a.total_retained_size)
                .then_with(|| a.type_name.cmp(&b.type_name))
        });
        stats
    }

    fn aggregate_type(
        &self,
        snapshot: &HeapSnapshot,
        type_name: &str,
        addresses: &[u64],
    ) -> TypeStatistics {
        let mut total_size = 0u64;
        let mut total_retained = 0u64;
        let mut generation_distribution: BTreeMap<u32, usize> = BTreeMap::new();
        let mut objects: Vec<&HeapObject> = Vec::with_capacity(addresses.len());

        for &address in addresses {
            if let Some(object) = snapshot.get(address) {
                total_size += object.shallow_size;
                total_retained += object.retained_size;
                *generation_distribution.entry(object.generation).or_insert(0) += 1;
                objects.push(object);
            }
        }

        objects.sort_unstable_by(|a, b| {
            b.retained_size
                .cmp(&a.retained_size)
                .then_with(|| a.address.cmp(&b.address))
        });
        let largest = objects
            .iter()
            .take(self.config.per_type_largest_count)
            .map(|o| Self::largest_entry(o))
            .collect();

        let instance_count = objects.len();
        TypeStatistics {
            type_name: type_name.to_string(),
            instance_count,
            total_size,
            total_retained_size: total_retained,
            avg_size: if instance_count == 0 {
                0.0
            } else {
                total_size as f64 / instance_count as f64
            },
            generation_distribution,
            largest,
        }
    }

    fn generation_statistics(snapshot: &HeapSnapshot) -> Vec<GenerationStatistics> {
        let mut rollups: BTreeMap<u32, GenerationStatistics> = BTreeMap::new();
        for object in snapshot.objects() {
            let entry = rollups
                .entry(object.generation)
                .or_insert_with(|| GenerationStatistics {
                    generation: object.generation,
                    ..Default::default()
                });
            entry.object_count += 1;
            entry.total_size += object.shallow_size;
            entry.total_retained_size += object.retained_size;
        }
        rollups.into_values().collect()
    }

    fn largest_objects(&self, snapshot: &HeapSnapshot) -> Vec<LargestObject> {
        let mut objects: Vec<&HeapObject> = snapshot.objects().collect();
        objects.par_sort_unstable_by(|a, b| {
            b.retained_size
                .cmp(&a.retained_size)
                .then_with(|| a.address.cmp(&b.address))
        });
        objects
            .iter()
            .take(self.config.largest_objects_count)
            .map(|o| Self::largest_entry(o))
            .collect()
    }

    fn largest_entry(object: &HeapObject) -> LargestObject {
        LargestObject {
            address: object.address,
            type_name: object.type_name.to_string(),
            shallow_size: object.shallow_size,
            retained_size: object.retained_size,
            generation: object.generation,
        }
    }
}
