//! Trie roots: node lookup, creation and pruning.
//!
//! One `TrieRoot` exists per trie family. The nameless root node has one
//! child per namespace root (named after the protocol), and paths descend
//! from there one segment at a time. Archives hang below their host file as a
//! `!/` child whose domain is the archive protocol.

use std::cmp::Ordering;

use super::node::{case_flags, NodeFlags, NodeTarget, TrieNode};
use crate::error::{PointerError, Result};
use crate::pointer::{PointerId, PointerTable};
use crate::storage::{NodeIndex, OptionNodeIndex, Slab, NAME_POOL};
use crate::vfs::url::{compare_names, push_segment, to_url, ARCHIVE_SEPARATOR, ROOT_SEGMENT};
use crate::vfs::{ancestry, same_file, segment_name, FileRef, NamespaceTable, ParsedUrl, TrieFamily};

#[derive(Debug)]
pub struct TrieRoot {
    family: TrieFamily,
    pub(super) nodes: Slab<TrieNode>,
    root: NodeIndex,
    linear_scan_threshold: usize,
}

impl TrieRoot {
    pub fn new(family: TrieFamily, linear_scan_threshold: usize) -> Self {
        let mut nodes = Slab::new();
        let root = nodes.insert(TrieNode::new(
            "",
            OptionNodeIndex::none(),
            NodeTarget::Unresolved(Box::from("")),
            "",
            NodeFlags::CASE_SENSITIVE | NodeFlags::CASE_KNOWN,
        ));
        Self {
            family,
            nodes,
            root,
            linear_scan_threshold,
        }
    }

    #[inline]
    pub fn family(&self) -> TrieFamily {
        self.family
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    #[inline]
    pub fn node(&self, index: NodeIndex) -> Option<&TrieNode> {
        self.nodes.get(index)
    }

    /// Number of nodes, the nameless root excluded.
    pub fn node_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Position of `name` among the children of `parent`: `Ok` when found,
    /// `Err` with the insertion point otherwise.
    pub(super) fn search(&self, parent: NodeIndex, name: &str) -> std::result::Result<usize, usize> {
        let node = &self.nodes[parent];
        let case_sensitive = node.is_case_sensitive();
        let children = &node.children;
        if children.len() <= self.linear_scan_threshold {
            for (pos, &child) in children.iter().enumerate() {
                match compare_names(self.nodes[child].name, name, case_sensitive) {
                    Ordering::Less => continue,
                    Ordering::Equal => return Ok(pos),
                    Ordering::Greater => return Err(pos),
                }
            }
            Err(children.len())
        } else {
            children.binary_search_by(|&child| {
                compare_names(self.nodes[child].name, name, case_sensitive)
            })
        }
    }

    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        let pos = self.search(parent, name).ok()?;
        Some(self.nodes[parent].children[pos])
    }

    /// Finds the child named `name`, creating it when absent.
    ///
    /// A known live `file` resolves the new node directly; otherwise the node
    /// starts out unresolved with a url derived from its parent.
    pub(super) fn find_or_create_child(
        &mut self,
        parent: NodeIndex,
        name: &str,
        domain: &'static str,
        file: Option<&FileRef>,
        namespaces: &NamespaceTable,
        pointers: &mut PointerTable,
    ) -> NodeIndex {
        match self.search(parent, name) {
            Ok(pos) => {
                let child = self.nodes[parent].children[pos];
                if let Some(file) = file {
                    self.adopt_file(child, file, pointers);
                }
                child
            }
            Err(pos) => {
                let (target, flags) = match file {
                    Some(file) => (
                        NodeTarget::Resolved(file.clone()),
                        case_flags(file.is_case_sensitive(), true),
                    ),
                    None => (
                        NodeTarget::Unresolved(self.child_url(parent, name, domain).into()),
                        case_flags(namespaces.default_case_sensitive(domain), false),
                    ),
                };
                let node = TrieNode::new(
                    NAME_POOL.intern(name),
                    OptionNodeIndex::some(parent),
                    target,
                    domain,
                    flags,
                );
                let index = self.nodes.insert(node);
                self.nodes[parent].children.insert(pos, index);
                index
            }
        }
    }

    /// Resolves `index` to `file` unless it already holds a live handle.
    pub(super) fn adopt_file(&mut self, index: NodeIndex, file: &FileRef, pointers: &mut PointerTable) {
        if self.nodes[index].target.valid_file().is_some() || !file.is_valid() {
            return;
        }
        self.nodes[index].target = NodeTarget::Resolved(file.clone());
        self.apply_case_rule(index, file.is_case_sensitive(), pointers);
    }

    /// Node standing for the root directory of `protocol`.
    pub(super) fn namespace_root(
        &mut self,
        protocol: &str,
        namespaces: &NamespaceTable,
        pointers: &mut PointerTable,
    ) -> NodeIndex {
        let root = self.root;
        match self.search(root, protocol) {
            Ok(pos) => {
                let index = self.nodes[root].children[pos];
                if let Some(file) = namespaces.get(protocol).and_then(|ns| ns.root()) {
                    self.adopt_file(index, &file, pointers);
                }
                index
            }
            Err(pos) => {
                let root_file = namespaces
                    .get(protocol)
                    .and_then(|ns| ns.root())
                    .filter(|file| file.is_valid());
                let (target, flags) = match root_file {
                    Some(file) => {
                        let flags = case_flags(file.is_case_sensitive(), true);
                        (NodeTarget::Resolved(file), flags)
                    }
                    None => (
                        NodeTarget::Unresolved(to_url(protocol, ROOT_SEGMENT).into()),
                        case_flags(namespaces.default_case_sensitive(protocol), false),
                    ),
                };
                let domain = NAME_POOL.intern(protocol);
                let node = TrieNode::new(
                    domain,
                    OptionNodeIndex::some(root),
                    target,
                    domain,
                    flags | NodeFlags::NAMESPACE_ROOT,
                );
                let index = self.nodes.insert(node);
                self.nodes[root].children.insert(pos, index);
                index
            }
        }
    }

    /// Finds or creates the node for a parsed url, resolving segments against
    /// live handles on the way down.
    pub fn find_or_create_by_url(
        &mut self,
        url: &ParsedUrl,
        namespaces: &NamespaceTable,
        pointers: &mut PointerTable,
    ) -> Result<NodeIndex> {
        let root_protocol = namespaces
            .root_protocol(&url.protocol)
            .ok_or_else(|| PointerError::UnknownNamespace(url.protocol.clone()))?;
        let host_domain = NAME_POOL.intern(root_protocol);
        let entry_domain = NAME_POOL.intern(&url.protocol);
        let host_segments = url.host_segment_count();

        let mut current = self.namespace_root(root_protocol, namespaces, pointers);
        for (pos, segment) in url.segments().into_iter().enumerate() {
            let domain = if pos < host_segments {
                host_domain
            } else {
                entry_domain
            };
            let child_file = self.nodes[current]
                .target
                .valid_file()
                .and_then(|parent| lookup_child(parent, segment, domain, namespaces));
            current = self.find_or_create_child(
                current,
                segment,
                domain,
                child_file.as_ref(),
                namespaces,
                pointers,
            );
        }
        Ok(current)
    }

    /// Finds the node for a parsed url without creating anything.
    pub fn find_by_url(&self, url: &ParsedUrl, namespaces: &NamespaceTable) -> Option<NodeIndex> {
        let root_protocol = namespaces.root_protocol(&url.protocol)?;
        let mut current = self.find_child(self.root, root_protocol)?;
        for segment in url.segments() {
            current = self.find_child(current, segment)?;
        }
        Some(current)
    }

    /// Finds or creates the node for `file`, walking its ancestry from the
    /// namespace root and resolving every node on the way.
    pub fn find_or_create_by_file(
        &mut self,
        file: &FileRef,
        namespaces: &NamespaceTable,
        pointers: &mut PointerTable,
    ) -> Result<NodeIndex> {
        let chain = ancestry(file);
        let Some((first, rest)) = chain.split_first() else {
            return Err(PointerError::Internal(format!("{file:?} has no ancestry")));
        };
        if !namespaces.contains(first.protocol()) {
            return Err(PointerError::UnknownNamespace(first.protocol().to_string()));
        }
        let mut current = self.namespace_root(first.protocol(), namespaces, pointers);
        self.adopt_file(current, first, pointers);
        for ancestor in rest {
            let segment = segment_name(ancestor.as_ref());
            let domain = NAME_POOL.intern(ancestor.protocol());
            let live = Some(ancestor).filter(|f| f.is_valid());
            current =
                self.find_or_create_child(current, &segment, domain, live, namespaces, pointers);
        }
        Ok(current)
    }

    /// Deepest existing node along the ancestry of `file`, and whether it is
    /// the node for `file` itself.
    pub fn find_deepest_by_file(&self, file: &FileRef) -> Option<(NodeIndex, bool)> {
        let chain = ancestry(file);
        let (first, rest) = chain.split_first()?;
        let mut current = self.find_child(self.root, first.protocol())?;
        for ancestor in rest {
            match self.find_child(current, &segment_name(ancestor.as_ref())) {
                Some(child) => current = child,
                None => return Some((current, false)),
            }
        }
        Some((current, true))
    }

    pub fn find_by_file(&self, file: &FileRef) -> Option<NodeIndex> {
        match self.find_deepest_by_file(file)? {
            (index, true) => Some(index),
            (_, false) => None,
        }
    }

    pub fn add_leaf(&mut self, index: NodeIndex, id: PointerId) {
        self.nodes[index].leaves.add(id);
    }

    /// Detaches `id` from `index`, returning the number of pointers left there.
    pub fn remove_leaf(&mut self, index: NodeIndex, id: PointerId) -> usize {
        match self.nodes.get_mut(index) {
            Some(node) => node.leaves.remove(id),
            None => 0,
        }
    }

    /// Removes the trailing chain of empty nodes ending at `index`.
    pub fn prune(&mut self, index: NodeIndex) {
        let mut current = index;
        while current != self.root {
            let Some(node) = self.nodes.get(current) else {
                break;
            };
            if !node.is_prunable() {
                break;
            }
            let parent = node.parent.to_option();
            self.detach(current);
            self.nodes.try_remove(current);
            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    pub fn prune_by_url(&mut self, url: &ParsedUrl, namespaces: &NamespaceTable) {
        if let Some(index) = self.find_by_url(url, namespaces) {
            self.prune(index);
        }
    }

    pub fn prune_by_file(&mut self, file: &FileRef) {
        if let Some(index) = self.find_by_file(file) {
            self.prune(index);
        }
    }

    /// Unlinks `index` from its parent's child list.
    pub(super) fn detach(&mut self, index: NodeIndex) {
        let Some(parent) = self.nodes.get(index).and_then(|node| node.parent.to_option()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent) {
            if let Some(pos) = parent.children.iter().position(|&child| child == index) {
                parent.children.remove(pos);
            }
        }
    }

    /// Path of `index` below its namespace root, e.g. `/lib/rt.jar!/java`.
    pub fn node_path(&self, index: NodeIndex) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = index;
        loop {
            let node = self.nodes.get(current)?;
            segments.push(node.segment());
            if node.is_namespace_root() {
                break;
            }
            current = node.parent.to_option()?;
        }
        let mut path = String::new();
        for segment in segments.iter().rev() {
            push_segment(&mut path, segment);
        }
        Some(path)
    }

    pub fn node_url(&self, index: NodeIndex) -> Option<String> {
        let path = self.node_path(index)?;
        Some(to_url(self.nodes[index].domain, &path))
    }

    pub(super) fn child_url(&self, parent: NodeIndex, segment: &str, domain: &str) -> String {
        let mut path = self.node_path(parent).unwrap_or_default();
        push_segment(&mut path, segment);
        to_url(domain, &path)
    }

    /// Every pointer attached at or below `index`.
    pub fn subtree_pointers(&self, index: NodeIndex, out: &mut Vec<PointerId>) {
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                out.extend(node.leaves.iter());
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }
}

/// Direct child lookup from a live parent handle, crossing into archives at
/// the `!/` segment.
pub(super) fn lookup_child(
    parent: &FileRef,
    segment: &str,
    domain: &str,
    namespaces: &NamespaceTable,
) -> Option<FileRef> {
    let child = if segment == ARCHIVE_SEPARATOR {
        namespaces.get(domain)?.mount(parent)
    } else {
        parent.find_child(segment)
    };
    child.filter(|file| file.is_valid())
}

/// Whether `file` is still where the trie places it: below `parent_file`
/// and named `name` under `case_sensitive`.
pub(super) fn is_in_place(
    file: &FileRef,
    parent_file: Option<&FileRef>,
    name: &str,
    case_sensitive: bool,
) -> bool {
    let actual_parent = crate::vfs::parent_across_mounts(file.as_ref());
    match (actual_parent, parent_file) {
        (Some(actual), Some(expected)) => {
            same_file(actual.as_ref(), expected.as_ref())
                && crate::vfs::url::names_equal(&segment_name(file.as_ref()), name, case_sensitive)
        }
        (None, None) => true,
        _ => false,
    }
}
