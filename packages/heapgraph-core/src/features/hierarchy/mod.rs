//! Type-hierarchy index
//!
//! Groups concrete type names under a simplified base name so queries can
//! roll up `List<Int>` and `List<String>` under `List`. The rollup is
//! nominal, by name pattern: a dump carries no subtype metadata, so the
//! runtime's real inheritance relation is not recoverable here.

use ahash::{AHashMap, AHashSet};

use crate::features::snapshot::HeapSnapshot;
use crate::shared::interner::InternedString;
use crate::shared::models::HierarchyStats;

/// Strip generic arguments and array suffixes: everything from the first
/// `<` or `[` onward is removed.
pub fn strip_generics_and_arrays(type_name: &str) -> &str {
    match type_name.find(['<', '[']) {
        Some(pos) => &type_name[..pos],
        None => type_name,
    }
}

/// Base-name buckets over the snapshot's type population
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchyIndex {
    /// simplified base name -> concrete type names sharing it
    base_buckets: AHashMap<String, AHashSet<InternedString>>,
}

impl TypeHierarchyIndex {
    pub fn build(snapshot: &HeapSnapshot) -> Self {
        let mut base_buckets: AHashMap<String, AHashSet<InternedString>> = AHashMap::new();

        for type_name in snapshot.type_names() {
            let base = strip_generics_and_arrays(type_name);
            base_buckets
                .entry(base.to_string())
                .or_default()
                .insert(type_name.clone());

            // nested types additionally link to their outer type
            if let Some(plus) = type_name.find('+') {
                let outer = strip_generics_and_arrays(&type_name[..plus]);
                base_buckets
                    .entry(outer.to_string())
                    .or_default()
                    .insert(type_name.clone());
            }
        }

        Self { base_buckets }
    }

    /// Concrete type names bucketed under the base of `type_name`
    pub fn related_types(&self, type_name: &str) -> Vec<InternedString> {
        let base = strip_generics_and_arrays(type_name);
        let mut names: Vec<InternedString> = self
            .base_buckets
            .get(base)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Aggregate direct and rolled-up statistics for a type
    pub fn hierarchy_stats(&self, snapshot: &HeapSnapshot, type_name: &str) -> HierarchyStats {
        let base = strip_generics_and_arrays(type_name).to_string();

        let direct_addresses = snapshot.addresses_of_type(type_name);
        let direct_instances = direct_addresses.len();
        let direct_size: u64 = direct_addresses
            .iter()
            .filter_map(|&a| snapshot.get(a))
            .map(|o| o.shallow_size)
            .sum();

        let related = self.related_types(type_name);
        let mut total_instances = 0usize;
        let mut total_size = 0u64;
        let mut derived_types = Vec::new();

        for name in &related {
            let addresses = snapshot.addresses_of_type(name);
            total_instances += addresses.len();
            total_size += addresses
                .iter()
                .filter_map(|&a| snapshot.get(a))
                .map(|o| o.shallow_size)
                .sum::<u64>();
            if name.as_ref() != type_name {
                derived_types.push(name.to_string());
            }
        }

        HierarchyStats {
            base_name: base,
            direct_instances,
            total_instances_including_derived: total_instances,
            direct_size,
            total_size_including_derived: total_size,
            derived_types,
        }
    }
}
