//! Trie node types.

use bitflags::bitflags;
use thin_vec::ThinVec;

use super::leaves::Leaves;
use crate::storage::{NodeIndex, OptionNodeIndex};
use crate::vfs::url::ROOT_SEGMENT;
use crate::vfs::FileRef;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Children are ordered and matched case-sensitively.
        const CASE_SENSITIVE = 0b0000_0001;
        /// The case rule came from a resolved directory, not a namespace default.
        const CASE_KNOWN     = 0b0000_0010;
        /// Root directory of a namespace; its path segment is `/`.
        const NAMESPACE_ROOT = 0b0000_0100;
    }
}

/// What a node currently stands for.
#[derive(Debug, Clone)]
pub enum NodeTarget {
    /// The file exists and its handle is known.
    Resolved(FileRef),
    /// Only the url is known; the file may not exist.
    Unresolved(Box<str>),
}

impl NodeTarget {
    #[inline]
    pub fn file(&self) -> Option<&FileRef> {
        match self {
            Self::Resolved(file) => Some(file),
            Self::Unresolved(_) => None,
        }
    }

    /// The resolved file, if it is still valid.
    pub fn valid_file(&self) -> Option<&FileRef> {
        self.file().filter(|file| file.is_valid())
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// One path segment shared by every pointer whose path passes through it.
#[derive(Debug, Clone)]
pub struct TrieNode {
    /// Interned segment name; the protocol for namespace roots.
    pub name: &'static str,
    pub parent: OptionNodeIndex,
    /// Sorted by name under this node's case rule.
    pub children: ThinVec<NodeIndex>,
    pub target: NodeTarget,
    pub leaves: Leaves,
    /// Interned protocol of the namespace owning this segment.
    pub domain: &'static str,
    pub flags: NodeFlags,
}

impl TrieNode {
    pub fn new(
        name: &'static str,
        parent: OptionNodeIndex,
        target: NodeTarget,
        domain: &'static str,
        flags: NodeFlags,
    ) -> Self {
        Self {
            name,
            parent,
            children: ThinVec::new(),
            target,
            leaves: Leaves::Empty,
            domain,
            flags,
        }
    }

    /// Path segment this node contributes to urls.
    pub fn segment(&self) -> &'static str {
        if self.is_namespace_root() {
            ROOT_SEGMENT
        } else {
            self.name
        }
    }

    #[inline]
    pub fn is_namespace_root(&self) -> bool {
        self.flags.contains(NodeFlags::NAMESPACE_ROOT)
    }

    #[inline]
    pub fn is_case_sensitive(&self) -> bool {
        self.flags.contains(NodeFlags::CASE_SENSITIVE)
    }

    /// Nothing keeps this node alive.
    #[inline]
    pub fn is_prunable(&self) -> bool {
        self.children.is_empty() && self.leaves.is_empty()
    }
}

pub(crate) fn case_flags(case_sensitive: bool, known: bool) -> NodeFlags {
    let mut flags = NodeFlags::empty();
    flags.set(NodeFlags::CASE_SENSITIVE, case_sensitive);
    flags.set(NodeFlags::CASE_KNOWN, known);
    flags
}
