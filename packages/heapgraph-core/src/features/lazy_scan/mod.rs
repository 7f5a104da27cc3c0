//! Lazy per-type population
//!
//! When a client asks for objects of one type before the snapshot has been
//! eagerly ingested, walking and storing the whole heap is wasted work.
//! The scanner instead walks the source once per requested type, keeps only
//! matching objects, and remembers which types it has already scanned so
//! repeat queries touch no source at all.

use ahash::AHashSet;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::features::snapshot::source::HeapSource;
use crate::features::snapshot::HeapSnapshot;
use crate::shared::models::{HeapObject, ObjectReference};

/// Scan-once per-type loader over a non-analyzed snapshot
pub struct LazyTypeScanner<'a, S: HeapSource> {
    source: &'a S,
    config: &'a AnalysisConfig,
    scanned: AHashSet<String>,
    available: Option<AHashSet<String>>,
}

impl<'a, S: HeapSource> LazyTypeScanner<'a, S> {
    pub fn new(source: &'a S, config: &'a AnalysisConfig) -> Self {
        Self {
            source,
            config,
            scanned: AHashSet::new(),
            available: None,
        }
    }

    /// Whether this type's objects are already present without source work
    pub fn is_scanned(&self, type_name: &str) -> bool {
        self.scanned.contains(type_name)
    }

    /// Addresses of objects of the exact type, scanning the source at most
    /// once per type
    pub fn objects_of_type(
        &mut self,
        snapshot: &mut HeapSnapshot,
        type_name: &str,
    ) -> Vec<u64> {
        if snapshot.is_analyzed() || self.scanned.contains(type_name) {
            return snapshot.addresses_of_type(type_name).to_vec();
        }
        if !self.source.supports_reenumeration() {
            debug!("lazy scan: source is single-pass, serving from snapshot only");
            return snapshot.addresses_of_type(type_name).to_vec();
        }

        self.scan_once(snapshot, type_name);
        snapshot.addresses_of_type(type_name).to_vec()
    }

    /// Type names present in the source, collected from a single heap walk
    /// and cached
    pub fn available_type_names(&mut self) -> &AHashSet<String> {
        let source = self.source;
        self.available.get_or_insert_with(|| {
            let mut names = AHashSet::new();
            for item in source.enumerate_objects() {
                match item {
                    Ok(raw) => {
                        if !raw.type_name.is_empty() {
                            names.insert(raw.type_name);
                        }
                    }
                    Err(e) if !e.is_fatal() => warn!("lazy scan: {}", e),
                    Err(e) => {
                        warn!("lazy scan: name walk failed: {}", e);
                        break;
                    }
                }
            }
            debug!("lazy scan: {} type names available", names.len());
            names
        })
    }

    /// Addresses of objects whose type name satisfies the predicate. Each
    /// matching name is resolved through the scan-once path.
    pub fn objects_matching<F>(
        &mut self,
        snapshot: &mut HeapSnapshot,
        predicate: F,
    ) -> Vec<u64>
    where
        F: Fn(&str) -> bool,
    {
        let matching: Vec<String> = self
            .available_type_names()
            .iter()
            .filter(|name| predicate(name))
            .cloned()
            .collect();

        let mut out = Vec::new();
        for name in matching {
            out.extend(self.objects_of_type(snapshot, &name));
        }
        out
    }

    /// Pull one object through the source's single-address lookup, when the
    /// adapter supports it. Returns true when the object is tracked
    /// afterwards.
    pub fn fetch_object(&mut self, snapshot: &mut HeapSnapshot, address: u64) -> bool {
        if snapshot.contains(address) {
            return true;
        }
        let Some(raw) = self.source.get(address) else {
            return false;
        };
        if raw.address == 0 || raw.shallow_size == 0 || raw.type_name.is_empty() {
            return false;
        }

        let interned = snapshot.intern(&raw.type_name);
        let references: Vec<ObjectReference> = raw
            .references
            .iter()
            .filter(|r| r.target_address != 0 && !r.target_type.is_empty())
            .take(self.config.max_references_per_object)
            .map(|r| ObjectReference {
                source_address: raw.address,
                target_address: r.target_address,
                field_name: snapshot.intern(&r.field_name),
                target_type: snapshot.intern(&r.target_type),
            })
            .collect();

        snapshot.insert_object(HeapObject::new(
            raw.address,
            interned,
            raw.shallow_size,
            raw.generation,
            references,
        ));
        true
    }

    fn scan_once(&mut self, snapshot: &mut HeapSnapshot, type_name: &str) {
        let cap = self.config.max_references_per_object;
        let mut found = 0usize;

        for item in self.source.enumerate_objects() {
            let raw = match item {
                Ok(raw) => raw,
                Err(e) if !e.is_fatal() => {
                    warn!("lazy scan: {}", e);
                    continue;
                }
                Err(e) => {
                    warn!("lazy scan: walk failed: {}", e);
                    break;
                }
            };

            if raw.type_name != type_name
                || raw.address == 0
                || raw.shallow_size == 0
                || snapshot.contains(raw.address)
            {
                continue;
            }

            let interned = snapshot.intern(&raw.type_name);
            let references: Vec<ObjectReference> = raw
                .references
                .iter()
                .filter(|r| r.target_address != 0 && !r.target_type.is_empty())
                .take(cap)
                .map(|r| ObjectReference {
                    source_address: raw.address,
                    target_address: r.target_address,
                    field_name: snapshot.intern(&r.field_name),
                    target_type: snapshot.intern(&r.target_type),
                })
                .collect();

            snapshot.insert_object(HeapObject::new(
                raw.address,
                interned,
                raw.shallow_size,
                raw.generation,
                references,
            ));
            found += 1;
        }

        debug!("lazy scan: {} objects of {}", found, type_name);
        self.scanned.insert(type_name.to_string());
    }
}
