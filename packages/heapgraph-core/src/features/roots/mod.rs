//! Root discovery
//!
//! Preferred path: consume the runtime-reported root iterator and attach a
//! `GcRootPath` record to every tracked target. When the runtime reports
//! nothing (or the enumeration fails), fall back to the zero-incoming-
//! reference heuristic. The fallback set is a superset of the real roots:
//! objects reachable only through a cycle still carry incoming edges, so
//! retained sizes computed from it may be overestimated. Reports carry the
//! `roots_via_refcount` flag whenever the fallback fired.

use ahash::AHashMap;
use tracing::{info, warn};

use crate::features::snapshot::source::HeapSource;
use crate::features::snapshot::{HeapSnapshot, RootProvenance};
use crate::shared::models::GcRootPath;

/// Outcome of one discovery pass
#[derive(Debug, Clone)]
pub struct RootDiscoverySummary {
    /// Deduplicated tracked root addresses, in first-seen order
    pub roots: Vec<u64>,
    /// Whether the refcount fallback produced the set
    pub via_refcount: bool,
    /// Runtime-reported records consumed
    pub reported: usize,
    /// Reported records whose target was not a tracked object
    pub dropped: usize,
}

/// Discovers the root set for a populated snapshot
pub struct RootDiscovery;

impl RootDiscovery {
    /// Discover roots, preferring the runtime's report
    ///
    /// The result is stored on the snapshot and reused: a second call
    /// returns the stored set without touching the source.
    pub fn discover<S: HeapSource>(
        snapshot: &mut HeapSnapshot,
        source: &S,
    ) -> RootDiscoverySummary {
        if snapshot.root_provenance() != RootProvenance::Undiscovered {
            return RootDiscoverySummary {
                roots: snapshot.roots().to_vec(),
                via_refcount: snapshot.root_provenance() == RootProvenance::RefCountFallback,
                reported: 0,
                dropped: 0,
            };
        }

        let mut roots = Vec::new();
        let mut reported = 0usize;
        let mut dropped = 0usize;
        let mut enumeration_failed = false;

        for item in source.enumerate_roots() {
            let raw = match item {
                Ok(raw) => raw,
                Err(e) if !e.is_fatal() => {
                    warn!("roots: {}", e);
                    continue;
                }
                Err(e) => {
                    warn!("roots: enumeration failed: {}", e);
                    enumeration_failed = true;
                    break;
                }
            };

            reported += 1;
            if let Some(object) = snapshot.get_mut(raw.target_address) {
                object.add_root_path(GcRootPath {
                    kind: raw.kind,
                    root_address: raw.root_address,
                    object_address: raw.target_address,
                    root_name: raw.name,
                });
                roots.push(raw.target_address);
            } else {
                dropped += 1;
            }
        }

        if roots.is_empty() || enumeration_failed {
            let fallback = Self::refcount_fallback(snapshot);
            info!(
                "roots: refcount fallback produced {} roots ({} reported, {} dropped)",
                fallback.len(),
                reported,
                dropped
            );
            snapshot.set_roots(fallback, RootProvenance::RefCountFallback);
            return RootDiscoverySummary {
                roots: snapshot.roots().to_vec(),
                via_refcount: true,
                reported,
                dropped,
            };
        }

        info!(
            "roots: {} reported, {} tracked, {} dropped",
            reported,
            roots.len(),
            dropped
        );
        snapshot.set_roots(roots, RootProvenance::Reported);
        RootDiscoverySummary {
            roots: snapshot.roots().to_vec(),
            via_refcount: false,
            reported,
            dropped,
        }
    }

    /// Objects with no incoming references from other tracked objects
    fn refcount_fallback(snapshot: &HeapSnapshot) -> Vec<u64> {
        let mut incoming: AHashMap<u64, u32> = AHashMap::with_capacity(snapshot.len());
        for object in snapshot.objects() {
            for reference in &object.references {
                // a self-reference must not keep its own object out of the
                // fallback set
                if reference.target_address != object.address
                    && snapshot.contains(reference.target_address)
                {
                    *incoming.entry(reference.target_address).or_insert(0) += 1;
                }
            }
        }

        let mut roots: Vec<u64> = snapshot
            .objects()
            .filter(|o| !incoming.contains_key(&o.address))
            .map(|o| o.address)
            .collect();
        roots.sort_unstable();
        roots
    }
}
