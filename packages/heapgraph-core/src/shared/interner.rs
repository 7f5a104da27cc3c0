//! String interning for type and field names
//!
//! A heap dump repeats the same type and field names millions of times.
//! Interning maps each distinct string to one shared `Arc<str>` handle, so
//! equality is cheap and storage is paid once per unique name.
//!
//! The pool is insert-or-get and grow-only: handles stay valid for the life
//! of the interner, and concurrent readers never observe a removal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Interned string handle. Same strings share the same Arc.
pub type InternedString = Arc<str>;

/// Interning counters, exposed for diagnostics
#[derive(Debug, Default, Clone)]
pub struct InternerStats {
    pub total_strings: usize,
    pub unique_strings: usize,
    pub bytes_saved: usize,
}

/// Thread-safe insert-or-get string pool
///
/// `intern(a)` and `intern(b)` return pointer-equal handles exactly when the
/// inputs are byte-equal. The empty string is returned unchanged and never
/// enters the pool.
#[derive(Debug, Default)]
pub struct StringInterner {
    pool: DashMap<Box<str>, InternedString>,
    total: AtomicUsize,
    unique: AtomicUsize,
    bytes_saved: AtomicUsize,
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            pool: DashMap::with_capacity(1024),
            total: AtomicUsize::new(0),
            unique: AtomicUsize::new(0),
            bytes_saved: AtomicUsize::new(0),
        }
    }

    /// Intern a string, returning the canonical shared handle
    pub fn intern(&self, s: &str) -> InternedString {
        if s.is_empty() {
            return Arc::from("");
        }

        self.total.fetch_add(1, Ordering::Relaxed);

        if let Some(existing) = self.pool.get(s) {
            self.bytes_saved.fetch_add(s.len(), Ordering::Relaxed);
            return existing.clone();
        }

        // entry() holds the shard lock, so the or_insert_with closure runs at
        // most once per unique key even under concurrent interning.
        self.pool
            .entry(Box::from(s))
            .or_insert_with(|| {
                self.unique.fetch_add(1, Ordering::Relaxed);
                Arc::from(s)
            })
            .clone()
    }

    /// Whether a string has been interned
    #[inline]
    pub fn contains(&self, s: &str) -> bool {
        self.pool.contains_key(s)
    }

    /// Number of unique interned strings
    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Snapshot of the interning counters
    pub fn stats(&self) -> InternerStats {
        InternerStats {
            total_strings: self.total.load(Ordering::Relaxed),
            unique_strings: self.unique.load(Ordering::Relaxed),
            bytes_saved: self.bytes_saved.load(Ordering::Relaxed),
        }
    }
}
