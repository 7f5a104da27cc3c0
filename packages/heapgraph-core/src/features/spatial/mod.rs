//! Spatial index
//!
//! Two sorted views over the final object set: fixed-count address buckets
//! for range and proximity queries, and coarse size classes for size-range
//! queries. Built once from a populated snapshot; results come back in
//! ascending address order.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::features::snapshot::HeapSnapshot;

/// Coarse size class of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    /// < 100 B
    Tiny,
    /// < 1 KiB
    Small,
    /// < 8 KiB
    Medium,
    /// < 64 KiB
    Large,
    /// < 1 MiB
    Huge,
    /// >= 1 MiB
    Giant,
}

impl SizeClass {
    pub const ALL: [SizeClass; 6] = [
        SizeClass::Tiny,
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Large,
        SizeClass::Huge,
        SizeClass::Giant,
    ];

    pub fn classify(size: u64) -> Self {
        match size {
            s if s < 100 => SizeClass::Tiny,
            s if s < 1 << 10 => SizeClass::Small,
            s if s < 8 << 10 => SizeClass::Medium,
            s if s < 64 << 10 => SizeClass::Large,
            s if s < 1 << 20 => SizeClass::Huge,
            _ => SizeClass::Giant,
        }
    }

    /// Inclusive lower bound, exclusive upper bound (None for unbounded)
    pub fn bounds(&self) -> (u64, Option<u64>) {
        match self {
            SizeClass::Tiny => (0, Some(100)),
            SizeClass::Small => (100, Some(1 << 10)),
            SizeClass::Medium => (1 << 10, Some(8 << 10)),
            SizeClass::Large => (8 << 10, Some(64 << 10)),
            SizeClass::Huge => (64 << 10, Some(1 << 20)),
            SizeClass::Giant => (1 << 20, None),
        }
    }
}

/// Fixed-count run of consecutive addresses
#[derive(Debug, Clone)]
struct AddressBucket {
    /// First address in the bucket
    start: u64,
    /// Addresses in ascending order
    addresses: Vec<u64>,
}

/// All objects of one size class
#[derive(Debug, Clone, Default)]
struct SizeBucket {
    min_size: u64,
    max_size: u64,
    /// (address, shallow size), ascending by address
    entries: Vec<(u64, u64)>,
}

/// Sorted-by-address and size-bucket views
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    buckets: Vec<AddressBucket>,
    size_buckets: [SizeBucket; 6],
    total: usize,
}

impl SpatialIndex {
    pub fn build(snapshot: &HeapSnapshot, config: &AnalysisConfig) -> Self {
        let mut sorted: Vec<(u64, u64)> = snapshot
            .objects()
            .map(|o| (o.address, o.shallow_size))
            .collect();
        sorted.sort_unstable_by_key(|&(address, _)| address);

        let capacity = config.address_bucket_capacity;
        let mut buckets = Vec::with_capacity(sorted.len() / capacity + 1);
        for chunk in sorted.chunks(capacity) {
            buckets.push(AddressBucket {
                start: chunk[0].0,
                addresses: chunk.iter().map(|&(address, _)| address).collect(),
            });
        }

        let mut size_buckets: [SizeBucket; 6] = Default::default();
        for &(address, size) in &sorted {
            let slot = SizeClass::classify(size) as usize;
            let bucket = &mut size_buckets[slot];
            if bucket.entries.is_empty() {
                bucket.min_size = size;
                bucket.max_size = size;
            } else {
                bucket.min_size = bucket.min_size.min(size);
                bucket.max_size = bucket.max_size.max(size);
            }
            bucket.entries.push((address, size));
        }

        Self {
            buckets,
            size_buckets,
            total: sorted.len(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Addresses in `[lo, hi]`, ascending
    pub fn range(&self, lo: u64, hi: u64) -> Vec<u64> {
        if self.buckets.is_empty() || lo > hi {
            return Vec::new();
        }

        // first bucket that could intersect: the one before the first
        // bucket starting above lo
        let first = self
            .buckets
            .partition_point(|b| b.start <= lo)
            .saturating_sub(1);

        let mut out = Vec::new();
        for bucket in &self.buckets[first..] {
            if bucket.start > hi {
                break;
            }
            for &address in &bucket.addresses {
                if address > hi {
                    break;
                }
                if address >= lo {
                    out.push(address);
                }
            }
        }
        out
    }

    /// Addresses of objects whose shallow size falls in `[lo, hi]`,
    /// ascending by address
    pub fn size_range(&self, lo: u64, hi: u64) -> Vec<u64> {
        if lo > hi {
            return Vec::new();
        }

        let mut out = Vec::new();
        for class in SizeClass::ALL {
            let (class_lo, class_hi) = class.bounds();
            let overlaps = class_hi.map(|h| lo < h).unwrap_or(true) && hi >= class_lo;
            if !overlaps {
                continue;
            }
            let bucket = &self.size_buckets[class as usize];
            if bucket.entries.is_empty() || bucket.min_size > hi || bucket.max_size < lo {
                continue;
            }
            out.extend(
                bucket
                    .entries
                    .iter()
                    .filter(|&&(_, size)| size >= lo && size <= hi)
                    .map(|&(address, _)| address),
            );
        }
        out.sort_unstable();
        out
    }

    /// Addresses within `prox` bytes of `address`
    pub fn nearby(&self, address: u64, prox: u64) -> Vec<u64> {
        self.range(address.saturating_sub(prox), address.saturating_add(prox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::HeapObject;

    fn snapshot_with_sizes(sizes: &[(u64, u64)]) -> HeapSnapshot {
        let mut snapshot = HeapSnapshot::new(1);
        for &(address, size) in sizes {
            let obj = HeapObject::new(address, snapshot.intern("T"), size, 0, Vec::new());
            snapshot.insert_object(obj);
        }
        snapshot
    }

    #[test]
    fn test_size_class_boundaries() {
        assert_eq!(SizeClass::classify(99), SizeClass::Tiny);
        assert_eq!(SizeClass::classify(100), SizeClass::Small);
        assert_eq!(SizeClass::classify(1023), SizeClass::Small);
        assert_eq!(SizeClass::classify(1024), SizeClass::Medium);
        assert_eq!(SizeClass::classify(8 << 10), SizeClass::Large);
        assert_eq!(SizeClass::classify(64 << 10), SizeClass::Huge);
        assert_eq!(SizeClass::classify(1 << 20), SizeClass::Giant);
    }

    #[test]
    fn test_address_range_query() {
        let snapshot = snapshot_with_sizes(&[(0x10, 8), (0x20, 8), (0x30, 8), (0x40, 8)]);
        let config = AnalysisConfig::default();
        let index = SpatialIndex::build(&snapshot, &config);

        assert_eq!(index.range(0x18, 0x38), vec![0x20, 0x30]);
        assert_eq!(index.range(0x10, 0x10), vec![0x10]);
        assert!(index.range(0x50, 0x60).is_empty());
        assert!(index.range(0x30, 0x20).is_empty());
    }

    #[test]
    fn test_range_spans_buckets() {
        let mut config = AnalysisConfig::default();
        config.address_bucket_capacity = 2;

        let entries: Vec<(u64, u64)> = (1..=10u64).map(|i| (i * 0x10, 8)).collect();
        let snapshot = snapshot_with_sizes(&entries);
        let index = SpatialIndex::build(&snapshot, &config);

        let hits = index.range(0x20, 0x90);
        assert_eq!(hits, (2..=9u64).map(|i| i * 0x10).collect::<Vec<_>>());
    }

    #[test]
    fn test_size_range_exact_filter() {
        // sizes spread over every class
        let snapshot = snapshot_with_sizes(&[
            (0x10, 50),
            (0x20, 900),
            (0x30, 5_000),
            (0x40, 50_000),
            (0x50, 900_000),
            (0x60, 2 << 20),
        ]);
        let config = AnalysisConfig::default();
        let index = SpatialIndex::build(&snapshot, &config);

        assert_eq!(index.size_range(1_000, 100_000), vec![0x30, 0x40]);
        assert_eq!(index.size_range(0, 100), vec![0x10]);
        assert_eq!(index.size_range(2 << 20, u64::MAX), vec![0x60]);
        assert!(index.size_range(100_001, 899_999).is_empty());
    }

    #[test]
    fn test_nearby_saturates_at_zero() {
        let snapshot = snapshot_with_sizes(&[(0x10, 8), (0x1000, 8)]);
        let config = AnalysisConfig::default();
        let index = SpatialIndex::build(&snapshot, &config);

        // lo would underflow without saturation
        assert_eq!(index.nearby(0x20, 0x100), vec![0x10]);
        assert_eq!(index.nearby(0x1000, 0), vec![0x1000]);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = HeapSnapshot::new(1);
        let config = AnalysisConfig::default();
        let index = SpatialIndex::build(&snapshot, &config);

        assert!(index.is_empty());
        assert!(index.range(0, u64::MAX).is_empty());
        assert!(index.size_range(0, u64::MAX).is_empty());
    }
}
