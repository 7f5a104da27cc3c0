//! Shared domain models
//!
//! Pure data types for the heap graph: objects, references, roots, and the
//! statistics/report types the query surface returns. Interned `Arc<str>`
//! handles are used for all names; the serde helpers below serialize them as
//! plain strings.

mod object;
mod root;
mod stats;

pub use object::{HeapObject, ObjectReference};
pub use root::{GcRootPath, RootKind};
pub use stats::{
    AnalysisFlags, GenerationStatistics, HeapAnalysisReport, HierarchyStats, LargestObject,
    ReferenceStats, TypeStatistics,
};

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize Arc<str> as a regular string
pub fn serialize_arc_str<S>(arc_str: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(arc_str.as_ref())
}

/// Deserialize string into Arc<str>
pub fn deserialize_arc_str<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(Arc::from(s.as_str()))
}
