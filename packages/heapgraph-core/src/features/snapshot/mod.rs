//! Heap snapshot model
//!
//! A `HeapSnapshot` owns everything decoded from one process dump: the
//! object map keyed by address, the per-type address index, the string
//! interner, the discovered root set, and lazily built query indices. It is
//! mutated only during ingestion and analysis; once analyzed it is
//! effectively immutable and safe to share between concurrent readers.

pub mod ingest;
pub mod source;

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::AnalysisConfig;
use crate::features::dominator::DominatorTree;
use crate::features::hierarchy::TypeHierarchyIndex;
use crate::features::refgraph::ReferenceGraphIndex;
use crate::features::spatial::SpatialIndex;
use crate::shared::interner::{InternedString, InternerStats, StringInterner};
use crate::shared::models::{AnalysisFlags, HeapObject};

/// How the root set was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootProvenance {
    /// No root discovery has run yet
    Undiscovered,
    /// Runtime-reported roots
    Reported,
    /// Zero-incoming-reference heuristic
    RefCountFallback,
}

/// One snapshot of a managed heap
pub struct HeapSnapshot {
    objects: AHashMap<u64, HeapObject>,
    /// type name -> addresses of that exact type, in insertion order
    type_index: AHashMap<InternedString, Vec<u64>>,
    interner: StringInterner,
    process_id: u32,
    captured_at: DateTime<Utc>,

    roots: Vec<u64>,
    root_set: AHashSet<u64>,
    root_provenance: RootProvenance,

    flags: AnalysisFlags,
    is_analyzed: bool,

    // Lazy query indices, built on first demand and evicted only by
    // snapshot disposal or further mutation.
    spatial: RwLock<Option<Arc<SpatialIndex>>>,
    hierarchy: RwLock<Option<Arc<TypeHierarchyIndex>>>,
    refgraph: RwLock<Option<Arc<ReferenceGraphIndex>>>,

    dominators: RwLock<Option<Arc<DominatorTree>>>,
}

impl HeapSnapshot {
    pub fn new(process_id: u32) -> Self {
        Self {
            objects: AHashMap::new(),
            type_index: AHashMap::new(),
            interner: StringInterner::new(),
            process_id,
            captured_at: Utc::now(),
            roots: Vec::new(),
            root_set: AHashSet::new(),
            root_provenance: RootProvenance::Undiscovered,
            flags: AnalysisFlags::default(),
            is_analyzed: false,
            spatial: RwLock::new(None),
            hierarchy: RwLock::new(None),
            refgraph: RwLock::new(None),
            dominators: RwLock::new(None),
        }
    }

    // ------------------------------------------------------------------
    // Object map
    // ------------------------------------------------------------------

    /// Insert or replace a tracked object, keeping the type index in sync
    /// and evicting lazily built indices.
    pub fn insert_object(&mut self, object: HeapObject) {
        debug_assert_ne!(object.address, 0);
        debug_assert!(!object.type_name.is_empty());

        let address = object.address;
        let type_name = object.type_name.clone();

        if let Some(old) = self.objects.insert(address, object) {
            if let Some(addresses) = self.type_index.get_mut(&old.type_name) {
                addresses.retain(|&a| a != address);
            }
        }

        self.type_index.entry(type_name).or_default().push(address);
        self.invalidate_indices();
    }

    #[inline]
    pub fn get(&self, address: u64) -> Option<&HeapObject> {
        self.objects.get(&address)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, address: u64) -> Option<&mut HeapObject> {
        self.objects.get_mut(&address)
    }

    #[inline]
    pub fn contains(&self, address: u64) -> bool {
        self.objects.contains_key(&address)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> impl Iterator<Item = &HeapObject> {
        self.objects.values()
    }

    pub(crate) fn objects_mut(&mut self) -> impl Iterator<Item = &mut HeapObject> {
        self.objects.values_mut()
    }

    pub fn addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.objects.keys().copied()
    }

    /// Total shallow bytes across all tracked objects
    pub fn total_memory(&self) -> u64 {
        self.objects.values().map(|o| o.shallow_size).sum()
    }

    // ------------------------------------------------------------------
    // Type index and interner
    // ------------------------------------------------------------------

    #[inline]
    pub fn intern(&self, s: &str) -> InternedString {
        self.interner.intern(s)
    }

    pub fn interner_stats(&self) -> InternerStats {
        self.interner.stats()
    }

    /// Addresses of the exact type, in insertion order
    pub fn addresses_of_type(&self, type_name: &str) -> &[u64] {
        self.type_index
            .get(type_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn type_names(&self) -> impl Iterator<Item = &InternedString> {
        self.type_index.keys()
    }

    pub fn type_entries(&self) -> impl Iterator<Item = (&InternedString, &Vec<u64>)> {
        self.type_index.iter()
    }

    // ------------------------------------------------------------------
    // Roots
    // ------------------------------------------------------------------

    /// Record the discovered root set. Duplicates are dropped, order of
    /// first appearance is kept.
    pub(crate) fn set_roots(&mut self, addresses: Vec<u64>, provenance: RootProvenance) {
        self.roots.clear();
        self.root_set.clear();
        for address in addresses {
            if self.root_set.insert(address) {
                self.roots.push(address);
            }
        }
        self.root_provenance = provenance;
        if provenance == RootProvenance::RefCountFallback {
            self.flags.roots_via_refcount = true;
        }
    }

    #[inline]
    pub fn roots(&self) -> &[u64] {
        &self.roots
    }

    #[inline]
    pub fn is_root(&self, address: u64) -> bool {
        self.root_set.contains(&address)
    }

    #[inline]
    pub fn root_provenance(&self) -> RootProvenance {
        self.root_provenance
    }

    // ------------------------------------------------------------------
    // Metadata and flags
    // ------------------------------------------------------------------

    #[inline]
    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    #[inline]
    pub fn is_analyzed(&self) -> bool {
        self.is_analyzed
    }

    pub(crate) fn mark_analyzed(&mut self) {
        self.is_analyzed = true;
    }

    pub fn flags(&self) -> AnalysisFlags {
        self.flags.clone()
    }

    pub(crate) fn flags_mut(&mut self) -> &mut AnalysisFlags {
        &mut self.flags
    }

    // ------------------------------------------------------------------
    // Lazy indices
    // ------------------------------------------------------------------

    /// Address and size-bucket views, built on first use
    pub fn spatial_index(&self, config: &AnalysisConfig) -> Arc<SpatialIndex> {
        if let Some(index) = self.spatial.read().as_ref() {
            return Arc::clone(index);
        }
        let mut slot = self.spatial.write();
        if let Some(index) = slot.as_ref() {
            return Arc::clone(index);
        }
        let built = Arc::new(SpatialIndex::build(self, config));
        *slot = Some(Arc::clone(&built));
        built
    }

    /// Base-name hierarchy buckets, built on first use
    pub fn hierarchy_index(&self) -> Arc<TypeHierarchyIndex> {
        if let Some(index) = self.hierarchy.read().as_ref() {
            return Arc::clone(index);
        }
        let mut slot = self.hierarchy.write();
        if let Some(index) = slot.as_ref() {
            return Arc::clone(index);
        }
        let built = Arc::new(TypeHierarchyIndex::build(self));
        *slot = Some(Arc::clone(&built));
        built
    }

    /// Outgoing/incoming adjacency, built on first use
    pub fn reference_graph(&self) -> Arc<ReferenceGraphIndex> {
        if let Some(index) = self.refgraph.read().as_ref() {
            return Arc::clone(index);
        }
        let mut slot = self.refgraph.write();
        if let Some(index) = slot.as_ref() {
            return Arc::clone(index);
        }
        let built = Arc::new(ReferenceGraphIndex::build(self));
        *slot = Some(Arc::clone(&built));
        built
    }

    /// The reference graph only if a query already forced its construction
    pub fn reference_graph_if_built(&self) -> Option<Arc<ReferenceGraphIndex>> {
        self.refgraph.read().as_ref().map(Arc::clone)
    }

    pub(crate) fn set_dominators(&mut self, tree: Arc<DominatorTree>) {
        *self.dominators.write() = Some(tree);
    }

    pub fn dominators(&self) -> Option<Arc<DominatorTree>> {
        self.dominators.read().as_ref().map(Arc::clone)
    }

    fn invalidate_indices(&mut self) {
        *self.spatial.get_mut() = None;
        *self.hierarchy.get_mut() = None;
        *self.refgraph.get_mut() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ObjectReference;

    fn object(snapshot: &HeapSnapshot, address: u64, type_name: &str, size: u64) -> HeapObject {
        HeapObject::new(address, snapshot.intern(type_name), size, 0, Vec::new())
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut snapshot = HeapSnapshot::new(4242);
        let obj = object(&snapshot, 0x1000, "System.String", 32);
        snapshot.insert_object(obj);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(0x1000));
        assert_eq!(snapshot.get(0x1000).unwrap().shallow_size, 32);
        assert_eq!(snapshot.addresses_of_type("System.String"), &[0x1000]);
        assert_eq!(snapshot.total_memory(), 32);
    }

    #[test]
    fn test_replace_keeps_type_index_consistent() {
        let mut snapshot = HeapSnapshot::new(1);
        snapshot.insert_object(object(&snapshot, 0x10, "A", 8));
        snapshot.insert_object(object(&snapshot, 0x10, "B", 16));

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.addresses_of_type("A").is_empty());
        assert_eq!(snapshot.addresses_of_type("B"), &[0x10]);
    }

    #[test]
    fn test_roots_dedup_and_provenance() {
        let mut snapshot = HeapSnapshot::new(1);
        snapshot.insert_object(object(&snapshot, 0x10, "A", 8));
        snapshot.set_roots(vec![0x10, 0x10, 0x20], RootProvenance::Reported);

        assert_eq!(snapshot.roots(), &[0x10, 0x20]);
        assert!(snapshot.is_root(0x10));
        assert_eq!(snapshot.root_provenance(), RootProvenance::Reported);
        assert!(!snapshot.flags().roots_via_refcount);
    }

    #[test]
    fn test_refcount_fallback_sets_flag() {
        let mut snapshot = HeapSnapshot::new(1);
        snapshot.set_roots(vec![0x10], RootProvenance::RefCountFallback);
        assert!(snapshot.flags().roots_via_refcount);
    }

    #[test]
    fn test_mutation_evicts_lazy_indices() {
        let mut snapshot = HeapSnapshot::new(1);
        snapshot.insert_object(object(&snapshot, 0x10, "A", 8));

        let config = AnalysisConfig::default();
        let first = snapshot.spatial_index(&config);
        assert_eq!(first.len(), 1);

        snapshot.insert_object(object(&snapshot, 0x20, "A", 8));
        let rebuilt = snapshot.spatial_index(&config);
        assert_eq!(rebuilt.len(), 2);
    }

    #[test]
    fn test_reference_graph_only_when_forced() {
        let mut snapshot = HeapSnapshot::new(1);
        let target = object(&snapshot, 0x20, "B", 8);
        let mut src = object(&snapshot, 0x10, "A", 8);
        src.references.push(ObjectReference {
            source_address: 0x10,
            target_address: 0x20,
            field_name: snapshot.intern("child"),
            target_type: snapshot.intern("B"),
        });
        snapshot.insert_object(target);
        snapshot.insert_object(src);

        assert!(snapshot.reference_graph_if_built().is_none());
        let graph = snapshot.reference_graph();
        assert_eq!(graph.incoming_count(0x20), 1);
        assert!(snapshot.reference_graph_if_built().is_some());
    }
}
