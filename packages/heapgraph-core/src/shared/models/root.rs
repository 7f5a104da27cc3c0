//! GC root models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of runtime reference keeping an object alive independently of
/// in-heap pointers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootKind {
    StrongHandle,
    WeakHandle,
    Pinned,
    Stack,
    Finalizer,
    Static,
    Thread,
    AsyncPinned,
    Other,
}

impl RootKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootKind::StrongHandle => "strong_handle",
            RootKind::WeakHandle => "weak_handle",
            RootKind::Pinned => "pinned",
            RootKind::Stack => "stack",
            RootKind::Finalizer => "finalizer",
            RootKind::Static => "static",
            RootKind::Thread => "thread",
            RootKind::AsyncPinned => "async_pinned",
            RootKind::Other => "other",
        }
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One runtime-reported root record attached to a tracked object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GcRootPath {
    pub kind: RootKind,

    /// Address of the root slot itself (handle table entry, stack slot)
    pub root_address: u64,

    /// Address of the tracked object the root points at
    pub object_address: u64,

    /// Human-readable root description from the runtime
    pub root_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_kind_display() {
        assert_eq!(RootKind::Stack.to_string(), "stack");
        assert_eq!(RootKind::AsyncPinned.to_string(), "async_pinned");
    }
}
