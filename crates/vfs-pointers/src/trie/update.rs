//! Promotion, demotion and relocation of trie nodes after namespace changes.

use thin_vec::ThinVec;

use super::node::{NodeFlags, NodeTarget};
use super::root::{is_in_place, lookup_child, TrieRoot};
use crate::pointer::PointerTable;
use crate::storage::{NodeIndex, OptionNodeIndex, NAME_POOL};
use crate::vfs::url::{compare_names, names_equal, protocol_of, to_url, ROOT_SEGMENT};
use crate::vfs::{parent_across_mounts, same_file, segment_name, FileRef, NamespaceTable, ParsedUrl};

impl TrieRoot {
    /// Re-validates `index` against the live namespace.
    ///
    /// A live handle that is still in place is left alone. A moved handle is
    /// relocated, a missing one is looked up again from the parent's handle,
    /// and failing that the node falls back to its url. Children are only
    /// revisited when this node changed. Returns whether anything changed.
    pub fn update(
        &mut self,
        index: NodeIndex,
        namespaces: &NamespaceTable,
        pointers: &mut PointerTable,
    ) -> bool {
        if index == self.root() {
            return false;
        }
        let Some(node) = self.nodes.get(index) else {
            return false;
        };
        let is_namespace_root = node.is_namespace_root();
        let parent = node.parent.to_option();
        let file = node.target.valid_file().cloned();
        let name = node.name;

        let (changed, survivor) = match (is_namespace_root, parent, file) {
            (true, _, _) => (self.update_namespace_root(index, namespaces, pointers), index),
            (false, None, _) => return false,
            (false, Some(parent), Some(file)) => {
                let parent_node = &self.nodes[parent];
                if is_in_place(
                    &file,
                    parent_node.target.valid_file(),
                    name,
                    parent_node.is_case_sensitive(),
                ) {
                    self.rename_in_place(index, parent, &file, pointers)
                } else {
                    (true, self.relocate(index, &file, namespaces, pointers))
                }
            }
            (false, Some(parent), None) => {
                (self.reresolve(index, parent, namespaces, pointers), index)
            }
        };

        if changed {
            let children = self
                .nodes
                .get(survivor)
                .map(|node| node.children.to_vec())
                .unwrap_or_default();
            for child in children {
                self.update(child, namespaces, pointers);
            }
        }
        changed
    }

    fn update_namespace_root(
        &mut self,
        index: NodeIndex,
        namespaces: &NamespaceTable,
        pointers: &mut PointerTable,
    ) -> bool {
        let protocol = self.nodes[index].name;
        let root = namespaces
            .get(protocol)
            .and_then(|ns| ns.root())
            .filter(|file| file.is_valid());
        match root {
            Some(root) => {
                if self.nodes[index]
                    .target
                    .valid_file()
                    .is_some_and(|file| same_file(file.as_ref(), root.as_ref()))
                {
                    return false;
                }
                self.nodes[index].target = NodeTarget::Resolved(root.clone());
                self.apply_case_rule(index, root.is_case_sensitive(), pointers);
                true
            }
            None => {
                let url = to_url(protocol, ROOT_SEGMENT);
                self.set_unresolved(index, url)
            }
        }
    }

    /// Looks the node up again below its parent's handle, or demotes it.
    fn reresolve(
        &mut self,
        index: NodeIndex,
        parent: NodeIndex,
        namespaces: &NamespaceTable,
        pointers: &mut PointerTable,
    ) -> bool {
        let node = &self.nodes[index];
        let found = self.nodes[parent]
            .target
            .valid_file()
            .and_then(|parent_file| lookup_child(parent_file, node.name, node.domain, namespaces));
        match found {
            Some(file) => {
                let case_sensitive = file.is_case_sensitive();
                self.nodes[index].target = NodeTarget::Resolved(file);
                self.apply_case_rule(index, case_sensitive, pointers);
                true
            }
            None => {
                let url = self.node_url(index).unwrap_or_default();
                self.set_unresolved(index, url)
            }
        }
    }

    fn set_unresolved(&mut self, index: NodeIndex, url: String) -> bool {
        let node = &mut self.nodes[index];
        if let NodeTarget::Unresolved(existing) = &node.target {
            if **existing == *url {
                return false;
            }
        }
        node.target = NodeTarget::Unresolved(url.into());
        true
    }

    /// Takes over the exact spelling of a file that was renamed to a name
    /// equal under its directory's case rule.
    fn rename_in_place(
        &mut self,
        index: NodeIndex,
        parent: NodeIndex,
        file: &FileRef,
        pointers: &mut PointerTable,
    ) -> (bool, NodeIndex) {
        let name = segment_name(file.as_ref());
        if self.nodes[index].name == name {
            return (false, index);
        }
        self.detach(index);
        self.nodes[index].name = NAME_POOL.intern(&name);
        let survivor = self.insert_child(parent, index, &name, pointers);
        self.rebase_urls(survivor);
        (true, survivor)
    }

    /// Moves `index` below the node of its file's actual parent, merging it
    /// into a same-named node already there. Returns the surviving node.
    fn relocate(
        &mut self,
        index: NodeIndex,
        file: &FileRef,
        namespaces: &NamespaceTable,
        pointers: &mut PointerTable,
    ) -> NodeIndex {
        let Some(parent) = parent_across_mounts(file.as_ref()) else {
            return index;
        };
        let Some(old_parent) = self.nodes[index].parent.to_option() else {
            return index;
        };
        let old_parent_url = self.node_url(old_parent);

        // Off the trie, the node cannot be merged away while the new parent
        // chain is resolved.
        self.detach(index);
        let new_parent = match self.find_or_create_by_file(&parent, namespaces, pointers) {
            Ok(new_parent) => new_parent,
            Err(err) => {
                log::warn!("cannot relocate {file:?}: {err}");
                let old_name = self.nodes[index].name;
                let survivor = self.insert_child(old_parent, index, old_name, pointers);
                if let Some(url) = self.node_url(survivor) {
                    self.set_unresolved(survivor, url);
                }
                return survivor;
            }
        };

        let name = segment_name(file.as_ref());
        {
            let node = &mut self.nodes[index];
            node.name = NAME_POOL.intern(&name);
            node.domain = NAME_POOL.intern(file.protocol());
        }
        let survivor = self.insert_child(new_parent, index, &name, pointers);
        log::debug!(
            "relocated {} to {:?}",
            name,
            self.node_url(survivor).unwrap_or_default()
        );
        self.rebase_urls(survivor);
        // Resolving the new parent chain may have merged the old parent
        // away, so it is found again by its url.
        if let Some(url) = old_parent_url {
            let protocol = protocol_of(&url);
            match ParsedUrl::parse(&url, namespaces.is_archive(protocol)) {
                Ok(parsed) => self.prune_by_url(&parsed, namespaces),
                Err(err) => log::warn!("cannot prune {url}: {err}"),
            }
        }
        survivor
    }

    /// Links the detached node `index` below `parent` as `name`, merging it
    /// into a same-named child. Returns the surviving node.
    fn insert_child(
        &mut self,
        parent: NodeIndex,
        index: NodeIndex,
        name: &str,
        pointers: &mut PointerTable,
    ) -> NodeIndex {
        self.nodes[index].parent = OptionNodeIndex::some(parent);
        match self.search(parent, name) {
            Ok(pos) => {
                let existing = self.nodes[parent].children[pos];
                self.merge_into(existing, index, pointers);
                existing
            }
            Err(pos) => {
                self.nodes[parent].children.insert(pos, index);
                index
            }
        }
    }

    /// Folds the detached node `source` into `dest`: leaves, handle and
    /// children move over, same-named children merge recursively. A leaf
    /// whose listener already has a pointer at `dest` is folded into it.
    pub(super) fn merge_into(&mut self, dest: NodeIndex, source: NodeIndex, pointers: &mut PointerTable) {
        if dest == source {
            return;
        }
        let Some(source_node) = self.nodes.try_remove(source) else {
            return;
        };
        let family = self.family();
        for id in source_node.leaves.iter() {
            let listener = pointers.get(id).map(|record| record.listener);
            let twin = self.nodes[dest].leaves.iter().find(|&existing| {
                pointers.get(existing).map(|record| record.listener) == listener
            });
            match twin {
                Some(existing) => pointers.fold(id, existing),
                None => {
                    pointers.relink(id, family, dest);
                    self.nodes[dest].leaves.add(id);
                }
            }
        }

        if self.nodes[dest].target.valid_file().is_none() {
            if let Some(file) = source_node.target.valid_file() {
                let case_sensitive = file.is_case_sensitive();
                self.nodes[dest].target = NodeTarget::Resolved(file.clone());
                self.apply_case_rule(dest, case_sensitive, pointers);
            }
        }

        for child in source_node.children {
            let name = self.nodes[child].name;
            match self.search(dest, name) {
                Ok(pos) => {
                    let existing = self.nodes[dest].children[pos];
                    self.merge_into(existing, child, pointers);
                }
                Err(pos) => {
                    self.nodes[child].parent = OptionNodeIndex::some(dest);
                    self.nodes[dest].children.insert(pos, child);
                }
            }
        }
    }

    /// Records the real case rule of a directory, re-sorting its children
    /// and merging the ones that now collide.
    pub(crate) fn apply_case_rule(
        &mut self,
        index: NodeIndex,
        case_sensitive: bool,
        pointers: &mut PointerTable,
    ) {
        let node = &mut self.nodes[index];
        node.flags.insert(NodeFlags::CASE_KNOWN);
        if node.is_case_sensitive() == case_sensitive {
            return;
        }
        node.flags.set(NodeFlags::CASE_SENSITIVE, case_sensitive);
        self.resort_children(index, pointers);
    }

    fn resort_children(&mut self, index: NodeIndex, pointers: &mut PointerTable) {
        let case_sensitive = self.nodes[index].is_case_sensitive();
        let mut children = std::mem::take(&mut self.nodes[index].children);
        children.sort_by(|&a, &b| compare_names(self.nodes[a].name, self.nodes[b].name, case_sensitive));

        let mut kept: ThinVec<NodeIndex> = ThinVec::with_capacity(children.len());
        let mut merged = false;
        for child in children {
            if let Some(&last) = kept.last() {
                if names_equal(self.nodes[last].name, self.nodes[child].name, case_sensitive) {
                    self.merge_into(last, child, pointers);
                    merged = true;
                    continue;
                }
            }
            kept.push(child);
        }
        self.nodes[index].children = kept;
        if merged {
            log::debug!(
                "merged case-colliding children of {:?}",
                self.node_url(index).unwrap_or_default()
            );
            self.rebase_urls(index);
        }
    }

    /// Recomputes the url of every unresolved node at or below `index`.
    fn rebase_urls(&mut self, index: NodeIndex) {
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            stack.extend(node.children.iter().copied());
            if !node.target.is_resolved() {
                if let Some(url) = self.node_url(current) {
                    self.set_unresolved(current, url);
                }
            }
        }
    }

    /// Demotes every node of `protocol`, and everything below those nodes, to
    /// its url. Returns the number of demoted nodes.
    pub fn demote_domain(&mut self, protocol: &str) -> usize {
        let mut demoted = Vec::new();
        let mut stack = vec![(self.root(), false)];
        while let Some((index, inside)) = stack.pop() {
            let node = &self.nodes[index];
            let inside = inside || (index != self.root() && node.domain == protocol);
            if inside && node.target.is_resolved() {
                demoted.push(index);
            }
            stack.extend(node.children.iter().map(|&child| (child, inside)));
        }
        for &index in &demoted {
            let url = self.node_url(index).unwrap_or_default();
            self.nodes[index].target = NodeTarget::Unresolved(url.into());
        }
        demoted.len()
    }

    /// Runs `update` over the whole trie, top-down. Returns the number of
    /// nodes that changed at the top of an update.
    pub fn resolve_all(&mut self, namespaces: &NamespaceTable, pointers: &mut PointerTable) -> usize {
        let mut changed = 0;
        let mut stack: Vec<NodeIndex> = self.nodes[self.root()].children.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            if self.update(index, namespaces, pointers) {
                changed += 1;
            }
            if let Some(node) = self.nodes.get(index) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        changed
    }
}
