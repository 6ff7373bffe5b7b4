use std::fmt;

use serde::Serialize;

use super::handle::FilePointer;

/// Identity of a registered `PointerListener`.
///
/// Pointers are deduplicated per (node, listener), so two callers sharing a
/// listener id share pointers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ListenerId(u64);

impl ListenerId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Receives validity changes of pointers, once before and once after the
/// namespace batch that caused them is applied.
///
/// Callbacks run outside the registry lock and may query pointers freely.
pub trait PointerListener: Send + Sync {
    fn before_validity_changed(&self, _pointers: &[FilePointer]) {}

    fn validity_changed(&self, _pointers: &[FilePointer]) {}
}
