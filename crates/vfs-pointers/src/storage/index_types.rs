//! Compact index types for trie node arenas.

use std::fmt;

/// A compact 32-bit index into a node arena.
///
/// Using u32 limits an arena to ~4 billion nodes, far beyond any realistic
/// pointer population. The u32::MAX value is reserved for `OptionNodeIndex`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Invalid index sentinel value (u32::MAX).
    pub const INVALID: Self = Self(u32::MAX);

    /// Creates a new NodeIndex from a usize.
    ///
    /// # Panics
    /// Panics if `index >= u32::MAX` (reserved for the None sentinel).
    #[inline]
    pub fn new(index: usize) -> Self {
        assert!(
            index < u32::MAX as usize,
            "node index must be less than u32::MAX"
        );
        Self(index as u32)
    }

    /// Returns the index as a usize.
    #[inline]
    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An optional node index using u32::MAX as the None sentinel.
///
/// Fits in 4 bytes instead of the 8 an `Option<NodeIndex>` would take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct OptionNodeIndex(u32);

impl OptionNodeIndex {
    /// Creates a None value.
    #[inline]
    pub fn none() -> Self {
        Self(u32::MAX)
    }

    /// Creates a Some value from a NodeIndex.
    #[inline]
    pub fn some(index: NodeIndex) -> Self {
        Self(index.0)
    }

    /// Creates from an `Option<NodeIndex>`.
    #[inline]
    pub fn from_option(index: Option<NodeIndex>) -> Self {
        index.map_or(Self::none(), Self::some)
    }

    /// Converts to an `Option<NodeIndex>`.
    #[inline]
    pub fn to_option(self) -> Option<NodeIndex> {
        if self.0 == u32::MAX {
            None
        } else {
            Some(NodeIndex(self.0))
        }
    }
}

impl Default for OptionNodeIndex {
    fn default() -> Self {
        Self::none()
    }
}
