//! HeapSource port
//!
//! The engine never reads a dump file itself. An external adapter decodes
//! the runtime's heap and hands over plain tuples through this port. The
//! iterators are finite and may fail mid-stream: an `Item` error skips one
//! object, a `Fatal` error terminates the scan.

use ahash::AHashMap;
use thiserror::Error;

use crate::shared::models::RootKind;

/// One decoded outbound reference, before interning and filtering
#[derive(Debug, Clone)]
pub struct RawReference {
    pub target_address: u64,
    pub target_type: String,
    pub field_name: String,
}

/// One decoded object, before interning and validation
#[derive(Debug, Clone)]
pub struct RawHeapObject {
    pub address: u64,
    pub type_name: String,
    pub shallow_size: u64,
    pub generation: u32,
    pub references: Vec<RawReference>,
}

/// One runtime-reported root
#[derive(Debug, Clone)]
pub struct RawRoot {
    pub kind: RootKind,
    pub root_address: u64,
    pub target_address: u64,
    pub name: String,
}

/// Errors produced while iterating a source
#[derive(Debug, Error)]
pub enum SourceError {
    /// One bad record; the scan continues
    #[error("skipping record: {0}")]
    Item(String),

    /// The scan cannot continue
    #[error("scan failed: {0}")]
    Fatal(String),
}

impl SourceError {
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Fatal(_))
    }
}

/// External adapter yielding decoded objects and roots
///
/// A returned iterator is single-pass; sources that can serve repeated walks
/// (needed by lazy per-type scans) advertise it via `supports_reenumeration`.
pub trait HeapSource {
    /// Walk all decoded objects
    fn enumerate_objects(&self)
        -> Box<dyn Iterator<Item = Result<RawHeapObject, SourceError>> + '_>;

    /// Walk runtime-reported roots
    fn enumerate_roots(&self) -> Box<dyn Iterator<Item = Result<RawRoot, SourceError>> + '_>;

    /// Single-object lookup, when the adapter supports it
    fn get(&self, address: u64) -> Option<RawHeapObject> {
        let _ = address;
        None
    }

    /// Whether `enumerate_objects` may be called more than once
    fn supports_reenumeration(&self) -> bool {
        false
    }
}

/// In-memory source backed by vectors
///
/// Used by embedders that already hold decoded objects, and throughout the
/// test suites.
#[derive(Debug, Default)]
pub struct VecHeapSource {
    objects: Vec<RawHeapObject>,
    roots: Vec<RawRoot>,
    by_address: AHashMap<u64, usize>,
}

impl VecHeapSource {
    pub fn new(objects: Vec<RawHeapObject>, roots: Vec<RawRoot>) -> Self {
        let by_address = objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.address, i))
            .collect();
        Self {
            objects,
            roots,
            by_address,
        }
    }

    pub fn push_object(&mut self, object: RawHeapObject) {
        self.by_address.insert(object.address, self.objects.len());
        self.objects.push(object);
    }

    pub fn push_root(&mut self, root: RawRoot) {
        self.roots.push(root);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl HeapSource for VecHeapSource {
    fn enumerate_objects(
        &self,
    ) -> Box<dyn Iterator<Item = Result<RawHeapObject, SourceError>> + '_> {
        Box::new(self.objects.iter().cloned().map(Ok))
    }

    fn enumerate_roots(&self) -> Box<dyn Iterator<Item = Result<RawRoot, SourceError>> + '_> {
        Box::new(self.roots.iter().cloned().map(Ok))
    }

    fn get(&self, address: u64) -> Option<RawHeapObject> {
        self.by_address
            .get(&address)
            .map(|&i| self.objects[i].clone())
    }

    fn supports_reenumeration(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(address: u64, type_name: &str, size: u64) -> RawHeapObject {
        RawHeapObject {
            address,
            type_name: type_name.to_string(),
            shallow_size: size,
            generation: 0,
            references: Vec::new(),
        }
    }

    #[test]
    fn test_vec_source_roundtrip() {
        let source = VecHeapSource::new(vec![raw(0x10, "A", 8), raw(0x20, "B", 16)], vec![]);

        let scanned: Vec<_> = source
            .enumerate_objects()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].address, 0x10);

        assert!(source.supports_reenumeration());
        assert_eq!(source.enumerate_objects().count(), 2);
    }

    #[test]
    fn test_vec_source_get() {
        let source = VecHeapSource::new(vec![raw(0x10, "A", 8)], vec![]);
        assert_eq!(source.get(0x10).unwrap().type_name, "A");
        assert!(source.get(0x99).is_none());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(SourceError::Fatal("truncated dump".into()).is_fatal());
        assert!(!SourceError::Item("bad record".into()).is_fatal());
    }
}
