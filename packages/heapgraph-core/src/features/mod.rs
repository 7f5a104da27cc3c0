//! Feature modules
//!
//! Vertical slices over the shared models: snapshot ingestion, root
//! discovery, dominators and retained sizes, the query indices, and the
//! report generator.

pub mod analysis;
pub mod dominator;
pub mod hierarchy;
pub mod lazy_scan;
pub mod query;
pub mod refgraph;
pub mod reporting;
pub mod roots;
pub mod snapshot;
pub mod spatial;
