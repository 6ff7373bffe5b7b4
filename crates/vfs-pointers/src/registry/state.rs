//! Shared mutable state behind the registry lock.

use fnv::FnvHashMap;

use super::listeners::Listeners;
use crate::cancel::CancellationToken;
use crate::error::{report_violation, PointerError, Result};
use crate::pointer::{ListenerId, PointerId, PointerRecord, PointerTable, PointerTarget, RecordTarget};
use crate::storage::NodeIndex;
use crate::trie::TrieRoot;
use crate::vfs::url::protocol_of;
use crate::vfs::{file_url, FileRef, NamespaceTable, ParsedUrl, TrieFamily};

type IdentityKey = (String, Option<ListenerId>);

pub(crate) struct State {
    pub namespaces: NamespaceTable,
    pub persistent: TrieRoot,
    pub ephemeral: TrieRoot,
    pub pointers: PointerTable,
    identity: FnvHashMap<IdentityKey, PointerId>,
    pub listeners: Listeners,
    /// Bumped on every structural change of the tries or the pointer table.
    pub version: u64,
}

impl State {
    pub fn new(linear_scan_threshold: usize) -> Self {
        Self {
            namespaces: NamespaceTable::new(),
            persistent: TrieRoot::new(TrieFamily::Persistent, linear_scan_threshold),
            ephemeral: TrieRoot::new(TrieFamily::Ephemeral, linear_scan_threshold),
            pointers: PointerTable::new(),
            identity: FnvHashMap::default(),
            listeners: Listeners::default(),
            version: 0,
        }
    }

    pub fn trie(&self, family: TrieFamily) -> &TrieRoot {
        match family {
            TrieFamily::Persistent => &self.persistent,
            TrieFamily::Ephemeral => &self.ephemeral,
        }
    }

    fn trie_mut(&mut self, family: TrieFamily) -> &mut TrieRoot {
        match family {
            TrieFamily::Persistent => &mut self.persistent,
            TrieFamily::Ephemeral => &mut self.ephemeral,
        }
    }

    /// Finds or creates the pointer for (`target`, `listener`), adding a
    /// reference to an existing one.
    pub fn create(
        &mut self,
        target: &PointerTarget,
        listener: Option<ListenerId>,
        recursive: bool,
        strict: bool,
    ) -> Result<PointerId> {
        let (protocol, url) = match target {
            PointerTarget::Url(url) => (protocol_of(url).to_string(), url.clone()),
            PointerTarget::File(file) => (file.protocol().to_string(), file_url(file)),
        };
        let Some(family) = self.namespaces.family_of(&protocol) else {
            let file = match target {
                PointerTarget::File(file) => Some(file.clone()),
                PointerTarget::Url(_) => None,
            };
            log::debug!("identity pointer for {url}: no trie support for {protocol}");
            return Ok(self.attach_identity(url, file, listener, recursive));
        };

        let trie = match family {
            TrieFamily::Persistent => &mut self.persistent,
            TrieFamily::Ephemeral => &mut self.ephemeral,
        };
        let node = match target {
            PointerTarget::Url(url) => {
                let parsed = ParsedUrl::parse(url, self.namespaces.is_archive(&protocol))?;
                trie.find_or_create_by_url(&parsed, &self.namespaces, &mut self.pointers)?
            }
            PointerTarget::File(file) => {
                trie.find_or_create_by_file(file, &self.namespaces, &mut self.pointers)?
            }
        };

        let domain = trie.node(node).map(|node| node.domain).unwrap_or_default();
        if domain != protocol {
            let error = PointerError::DomainMismatch(format!(
                "{url} resolved to a node of {domain}"
            ));
            if let Err(error) = report_violation(strict, error) {
                trie.prune(node);
                return Err(error);
            }
        }
        Ok(self.attach(family, node, listener, recursive))
    }

    /// Adds a reference to the pointer for (`node`, `listener`), creating it
    /// when absent.
    pub fn attach(
        &mut self,
        family: TrieFamily,
        node: NodeIndex,
        listener: Option<ListenerId>,
        recursive: bool,
    ) -> PointerId {
        let existing = self.trie(family).node(node).and_then(|node| {
            node.leaves.iter().find(|&id| {
                self.pointers
                    .get(id)
                    .is_some_and(|record| record.listener == listener)
            })
        });
        if let Some(id) = existing {
            if let Some(record) = self.pointers.get_mut(id) {
                record.refcount += 1;
                record.recursive |= recursive;
            }
            return id;
        }
        let id = self.pointers.insert(PointerRecord {
            target: RecordTarget::Node { family, node },
            refcount: 1,
            recursive,
            listener,
        });
        self.trie_mut(family).add_leaf(node, id);
        self.version += 1;
        id
    }

    fn attach_identity(
        &mut self,
        url: String,
        file: Option<FileRef>,
        listener: Option<ListenerId>,
        recursive: bool,
    ) -> PointerId {
        let key = (url, listener);
        if let Some(&id) = self.identity.get(&key) {
            if let Some(record) = self.pointers.get_mut(id) {
                record.refcount += 1;
                record.recursive |= recursive;
                return id;
            }
        }
        let id = self.pointers.insert(PointerRecord {
            target: RecordTarget::Identity {
                url: key.0.clone(),
                file,
            },
            refcount: 1,
            recursive,
            listener,
        });
        self.identity.insert(key, id);
        self.version += 1;
        id
    }

    /// Adds a reference for `listener` at the location of `source`.
    pub fn duplicate(
        &mut self,
        source: PointerId,
        listener: Option<ListenerId>,
    ) -> Result<PointerId> {
        let record = self
            .pointers
            .get(source)
            .ok_or_else(|| PointerError::Disposed(source.to_string()))?;
        let recursive = record.recursive;
        match record.target.clone() {
            RecordTarget::Node { family, node } => Ok(self.attach(family, node, listener, recursive)),
            RecordTarget::Identity { url, file } => {
                Ok(self.attach_identity(url, file, listener, recursive))
            }
        }
    }

    /// Drops `count` references to `id`, detaching it at zero.
    pub fn release(&mut self, id: PointerId, count: u32) -> Result<()> {
        let Some(id) = self.pointers.resolve(id) else {
            return Err(PointerError::AlreadyDisposed(id.to_string()));
        };
        let Some(record) = self.pointers.get_mut(id) else {
            return Err(PointerError::AlreadyDisposed(id.to_string()));
        };
        record.refcount = record.refcount.saturating_sub(count);
        if record.refcount > 0 {
            return Ok(());
        }
        let Some(record) = self.pointers.remove(id) else {
            return Ok(());
        };
        match record.target {
            RecordTarget::Node { family, node } => {
                let trie = self.trie_mut(family);
                if trie.remove_leaf(node, id) == 0 {
                    trie.prune(node);
                }
            }
            RecordTarget::Identity { url, .. } => {
                self.identity.remove(&(url, record.listener));
            }
        }
        self.version += 1;
        Ok(())
    }

    pub fn pointer_url(&self, id: PointerId) -> Option<String> {
        match &self.pointers.get(id)?.target {
            RecordTarget::Node { family, node } => self.trie(*family).node_url(*node),
            RecordTarget::Identity { url, .. } => Some(url.clone()),
        }
    }

    /// `None` when disposed, `Some(None)` when the file is missing.
    pub fn pointer_file(&self, id: PointerId) -> Option<Option<FileRef>> {
        match &self.pointers.get(id)?.target {
            RecordTarget::Node { family, node } => Some(
                self.trie(*family)
                    .node(*node)
                    .and_then(|node| node.target.valid_file().cloned()),
            ),
            RecordTarget::Identity { file, .. } => {
                Some(file.clone().filter(|file| file.is_valid()))
            }
        }
    }

    /// Re-validates one node after a batch.
    pub fn update(&mut self, family: TrieFamily, node: NodeIndex) -> bool {
        let trie = match family {
            TrieFamily::Persistent => &mut self.persistent,
            TrieFamily::Ephemeral => &mut self.ephemeral,
        };
        trie.update(node, &self.namespaces, &mut self.pointers)
    }

    pub fn resolve_all(&mut self) -> usize {
        let persistent = self
            .persistent
            .resolve_all(&self.namespaces, &mut self.pointers);
        let ephemeral = self
            .ephemeral
            .resolve_all(&self.namespaces, &mut self.pointers);
        if persistent + ephemeral > 0 {
            self.version += 1;
        }
        persistent + ephemeral
    }

    pub fn demote(&mut self, protocol: &str) -> usize {
        let Some(family) = self.namespaces.family_of(protocol) else {
            return 0;
        };
        let demoted = self.trie_mut(family).demote_domain(protocol);
        if demoted > 0 {
            self.version += 1;
        }
        demoted
    }

    pub fn node_count(&self) -> usize {
        self.persistent.node_count() + self.ephemeral.node_count()
    }

    /// Checks both tries, then that every record is attached where it says.
    pub fn check_consistency(&self, token: &CancellationToken) -> Result<bool> {
        for trie in [&self.persistent, &self.ephemeral] {
            if !trie.check_consistency(&self.pointers, token)? {
                return Ok(false);
            }
        }
        for (id, record) in self.pointers.iter() {
            match &record.target {
                RecordTarget::Node { family, node } => {
                    let attached = self
                        .trie(*family)
                        .node(*node)
                        .is_some_and(|node| node.leaves.contains(id));
                    if !attached {
                        return Err(PointerError::ConsistencyViolation(format!(
                            "{id} is not attached to {node:?}"
                        )));
                    }
                }
                RecordTarget::Identity { url, .. } => {
                    if self.identity.get(&(url.clone(), record.listener)) != Some(&id) {
                        return Err(PointerError::ConsistencyViolation(format!(
                            "identity pointer {id} for {url} is not indexed"
                        )));
                    }
                }
            }
        }
        if self.identity.len() > self.pointers.len() {
            return Err(PointerError::ConsistencyViolation(
                "identity index outlives its pointers".to_string(),
            ));
        }
        Ok(true)
    }
}
