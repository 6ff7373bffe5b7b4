//! Finding the pointers a mutation can affect.

use super::root::TrieRoot;
use crate::pointer::{PointerId, PointerTable};
use crate::storage::NodeIndex;
use crate::vfs::Anchor;

/// Pointers and nodes gathered for one trie while planning a batch.
#[derive(Debug, Default, Clone)]
pub struct Relevant {
    /// In discovery order; may contain duplicates across anchors.
    pub pointers: Vec<PointerId>,
    /// Anchor nodes to re-validate once the batch is applied.
    pub to_update: Vec<NodeIndex>,
}

impl Relevant {
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty() && self.to_update.is_empty()
    }
}

impl TrieRoot {
    /// Collects everything a change at `anchor` can affect: every pointer at
    /// or below the anchor, plus recursive pointers on its ancestors.
    pub fn collect_relevant(&self, anchor: &Anchor, pointers: &PointerTable, out: &mut Relevant) {
        let Some((deepest, exact)) = self.find_deepest_by_file(&anchor.parent) else {
            return;
        };
        if exact {
            if let Some(child) = self.find_child(deepest, &anchor.name) {
                self.subtree_pointers(child, &mut out.pointers);
                out.to_update.push(child);
            }
        }

        let mut current = Some(deepest);
        while let Some(index) = current {
            let Some(node) = self.node(index) else {
                break;
            };
            out.pointers.extend(
                node.leaves
                    .iter()
                    .filter(|&id| pointers.get(id).is_some_and(|record| record.recursive)),
            );
            current = node.parent.to_option();
        }
    }
}
