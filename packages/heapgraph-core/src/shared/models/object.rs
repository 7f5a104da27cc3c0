//! Heap object and reference models

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::root::GcRootPath;
use super::{deserialize_arc_str, serialize_arc_str};
use crate::shared::interner::InternedString;

/// A managed reference from one tracked object to another
///
/// `source_address` always equals the owning object's address. The target
/// may be untracked; dangling edges are tolerated and filtered when graphs
/// are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub source_address: u64,

    pub target_address: u64,

    /// Field the pointer was stored in (interned)
    #[serde(
        serialize_with = "serialize_arc_str",
        deserialize_with = "deserialize_arc_str"
    )]
    pub field_name: InternedString,

    /// Declared type of the target (interned)
    #[serde(
        serialize_with = "serialize_arc_str",
        deserialize_with = "deserialize_arc_str"
    )]
    pub target_type: InternedString,
}

/// A single live object decoded from a process dump
///
/// Immutable after ingestion except for `retained_size` (written once by
/// analysis) and `gc_root_paths` (appended during root discovery).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeapObject {
    /// Heap address, non-zero, unique within a snapshot
    pub address: u64,

    /// Type name (interned)
    #[serde(
        serialize_with = "serialize_arc_str",
        deserialize_with = "deserialize_arc_str"
    )]
    pub type_name: InternedString,

    /// Bytes occupied by the object itself, excluding referents
    pub shallow_size: u64,

    /// Runtime age class (0 for runtimes without generations)
    pub generation: u32,

    /// Outbound references in field order, capped at ingestion
    pub references: Vec<ObjectReference>,

    /// Decoded field values, when the source provides them. Opaque to the
    /// analysis; surfaced by the query facade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<AHashMap<String, serde_json::Value>>,

    /// Bytes reclaimed if this object became unreachable. Equals
    /// `shallow_size` until analysis writes it.
    pub retained_size: u64,

    /// Runtime-reported root records keeping this object alive
    pub gc_root_paths: Vec<GcRootPath>,
}

impl HeapObject {
    pub fn new(
        address: u64,
        type_name: InternedString,
        shallow_size: u64,
        generation: u32,
        references: Vec<ObjectReference>,
    ) -> Self {
        Self {
            address,
            type_name,
            shallow_size,
            generation,
            references,
            fields: None,
            retained_size: shallow_size,
            gc_root_paths: Vec::new(),
        }
    }

    /// Whether the runtime reported this object as a GC root
    #[inline]
    pub fn is_gc_root(&self) -> bool {
        !self.gc_root_paths.is_empty()
    }

    /// Append a root record, ignoring exact duplicates
    pub fn add_root_path(&mut self, path: GcRootPath) {
        if !self.gc_root_paths.contains(&path) {
            self.gc_root_paths.push(path);
        }
    }

    /// Outbound references whose target is a tracked object
    pub fn references_to<'a>(
        &'a self,
        target_address: u64,
    ) -> impl Iterator<Item = &'a ObjectReference> {
        self.references
            .iter()
            .filter(move |r| r.target_address == target_address)
    }
}
