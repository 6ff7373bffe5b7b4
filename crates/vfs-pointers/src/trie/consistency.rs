//! Structural checks over a whole trie.

use std::cmp::Ordering;

use super::node::{NodeTarget, TrieNode};
use super::root::{is_in_place, TrieRoot};
use crate::cancel::CancellationToken;
use crate::error::{PointerError, Result};
use crate::pointer::PointerTable;
use crate::storage::NodeIndex;
use crate::vfs::url::compare_names;

fn violation(message: String) -> PointerError {
    PointerError::ConsistencyViolation(message)
}

impl TrieRoot {
    /// Walks every node and checks ordering, linkage, leaves and targets.
    ///
    /// Returns `Ok(false)` when `token` was cancelled before the walk
    /// finished, and the first broken invariant as an error.
    pub fn check_consistency(&self, pointers: &PointerTable, token: &CancellationToken) -> Result<bool> {
        let mut stack = vec![self.root()];
        let mut visited = 0usize;
        while let Some(index) = stack.pop() {
            if token.is_cancelled_sparse(visited).is_none() {
                return Ok(false);
            }
            visited += 1;
            let node = self
                .node(index)
                .ok_or_else(|| violation(format!("dangling child {index:?}")))?;
            self.check_children(index, node)?;
            self.check_leaves(index, node, pointers)?;
            if index != self.root() {
                if node.is_prunable() {
                    return Err(violation(format!("empty node {}", self.describe(index))));
                }
                self.check_target(index, node)?;
            }
            stack.extend(node.children.iter().copied());
        }
        if visited != self.nodes.len() {
            return Err(violation(format!(
                "{} nodes are unreachable from the root",
                self.nodes.len() - visited
            )));
        }
        Ok(true)
    }

    fn describe(&self, index: NodeIndex) -> String {
        self.node_url(index)
            .unwrap_or_else(|| format!("{index:?}"))
    }

    fn check_children(&self, index: NodeIndex, node: &TrieNode) -> Result<()> {
        let case_sensitive = node.is_case_sensitive();
        for pair in node.children.windows(2) {
            let (a, b) = (&self.nodes[pair[0]], &self.nodes[pair[1]]);
            if compare_names(a.name, b.name, case_sensitive) != Ordering::Less {
                return Err(violation(format!(
                    "children {:?} and {:?} of {} are out of order",
                    a.name,
                    b.name,
                    self.describe(index)
                )));
            }
        }
        for &child in &node.children {
            let parent = self.node(child).and_then(|child| child.parent.to_option());
            if parent != Some(index) {
                return Err(violation(format!(
                    "child {child:?} of {} links to {parent:?}",
                    self.describe(index)
                )));
            }
        }
        Ok(())
    }

    fn check_leaves(&self, index: NodeIndex, node: &TrieNode, pointers: &PointerTable) -> Result<()> {
        let mut listeners = Vec::with_capacity(node.leaves.len());
        for id in node.leaves.iter() {
            if pointers.resolve(id) != Some(id) {
                return Err(violation(format!(
                    "{id} at {} is disposed or folded",
                    self.describe(index)
                )));
            }
            let record = pointers
                .get(id)
                .ok_or_else(|| violation(format!("{id} at {} is disposed", self.describe(index))))?;
            if listeners.contains(&record.listener) {
                return Err(violation(format!(
                    "{} holds two pointers for listener {:?}",
                    self.describe(index),
                    record.listener
                )));
            }
            listeners.push(record.listener);
            if record.node() != Some((self.family(), index)) {
                return Err(violation(format!(
                    "{id} at {} is linked to {:?}",
                    self.describe(index),
                    record.node()
                )));
            }
            if record.refcount == 0 {
                return Err(violation(format!("{id} has no references")));
            }
        }
        Ok(())
    }

    fn check_target(&self, index: NodeIndex, node: &TrieNode) -> Result<()> {
        match &node.target {
            NodeTarget::Resolved(file) if file.is_valid() => {
                if file.protocol() != node.domain {
                    return Err(violation(format!(
                        "{} holds a {} file",
                        self.describe(index),
                        file.protocol()
                    )));
                }
                if node.is_namespace_root() {
                    return Ok(());
                }
                let parent = node
                    .parent
                    .to_option()
                    .and_then(|parent| self.node(parent))
                    .ok_or_else(|| violation(format!("{} has no parent", self.describe(index))))?;
                if !is_in_place(
                    file,
                    parent.target.valid_file(),
                    node.name,
                    parent.is_case_sensitive(),
                ) {
                    return Err(violation(format!(
                        "{} does not match its file {file:?}",
                        self.describe(index)
                    )));
                }
                Ok(())
            }
            NodeTarget::Resolved(_) => Ok(()),
            NodeTarget::Unresolved(url) => {
                let expected = self.node_url(index).unwrap_or_default();
                if **url != *expected {
                    return Err(violation(format!("node url {url} should be {expected}")));
                }
                Ok(())
            }
        }
    }
}
