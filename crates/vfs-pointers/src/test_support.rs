//! Shared fixtures for unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cancel::CancellationToken;
use crate::config::{RegistryConfig, DEFAULT_LINEAR_SCAN_THRESHOLD};
use crate::pointer::{
    FilePointer, PointerId, PointerListener, PointerRecord, PointerTable, RecordTarget,
};
use crate::registry::PointerRegistry;
use crate::storage::NodeIndex;
use crate::trie::TrieRoot;
use crate::vfs::{FileRef, MemoryFs, NamespaceTable, ParsedUrl, TrieFamily};

/// A registry wired to a local disk, an archive namespace on top of it and
/// a temp namespace. Every namespace reports its events to the registry.
pub struct Fixture {
    pub registry: PointerRegistry,
    pub local: MemoryFs,
    pub jars: MemoryFs,
    pub temp: MemoryFs,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_local(MemoryFs::local())
    }

    pub fn with_local(local: MemoryFs) -> Self {
        Self::with_config(local, Self::config())
    }

    pub fn config() -> RegistryConfig {
        RegistryConfig::default()
            .with_strict(true)
            .with_consistency_checks(true)
            .with_linear_scan_threshold(DEFAULT_LINEAR_SCAN_THRESHOLD)
    }

    pub fn with_config(local: MemoryFs, config: RegistryConfig) -> Self {
        let jars = MemoryFs::archive(&local);
        let temp = MemoryFs::temp();
        let registry = PointerRegistry::new(config);
        for fs in [&local, &jars, &temp] {
            registry
                .register_namespace(Arc::new(fs.clone()))
                .expect("register namespace");
            fs.add_listener(registry.event_listener());
        }
        Self {
            registry,
            local,
            jars,
            temp,
        }
    }

    /// Creates `host_path` as an archive on the local disk and the entry
    /// `entry_path` inside it.
    pub fn jar_entry(&self, host_path: &str, entry_path: &str) -> FileRef {
        if let Some((parent, _)) = host_path.rsplit_once('/') {
            if !parent.is_empty() {
                self.local.create_dirs(parent).expect("create host dirs");
            }
        }
        let host = match self.local.find(host_path) {
            Some(host) => host,
            None => self.local.create_file(host_path).expect("create host"),
        };
        let mut current = self.jars.mount_archive(&host).expect("mount archive");
        let segments: Vec<&str> = entry_path.split('/').filter(|s| !s.is_empty()).collect();
        for (pos, segment) in segments.iter().enumerate() {
            let is_directory = pos + 1 < segments.len();
            current = match current.find_child(segment) {
                Some(child) => child,
                None => self
                    .jars
                    .create_child(&current, segment, is_directory)
                    .expect("create archive entry"),
            };
        }
        current
    }

    /// A bare persistent trie over the same namespaces, without a registry.
    pub fn trie_state(&self) -> TrieState {
        self.trie_state_with_threshold(DEFAULT_LINEAR_SCAN_THRESHOLD)
    }

    pub fn trie_state_with_threshold(&self, threshold: usize) -> TrieState {
        let mut namespaces = NamespaceTable::new();
        for fs in [&self.local, &self.jars, &self.temp] {
            namespaces
                .register(Arc::new(fs.clone()))
                .expect("register namespace");
        }
        TrieState {
            trie: TrieRoot::new(TrieFamily::Persistent, threshold),
            namespaces,
            pointers: PointerTable::new(),
        }
    }
}

/// A trie plus the tables its operations need.
pub struct TrieState {
    pub trie: TrieRoot,
    pub namespaces: NamespaceTable,
    pub pointers: PointerTable,
}

impl TrieState {
    pub fn create_url(&mut self, url: &str) -> NodeIndex {
        let protocol = crate::vfs::url::protocol_of(url);
        let parsed = ParsedUrl::parse(url, self.namespaces.is_archive(protocol)).expect("parse url");
        self.trie
            .find_or_create_by_url(&parsed, &self.namespaces, &mut self.pointers)
            .expect("create by url")
    }

    pub fn create_file(&mut self, file: &FileRef) -> NodeIndex {
        self.trie
            .find_or_create_by_file(file, &self.namespaces, &mut self.pointers)
            .expect("create by file")
    }

    pub fn find_url(&self, url: &str) -> Option<NodeIndex> {
        let protocol = crate::vfs::url::protocol_of(url);
        let parsed = ParsedUrl::parse(url, self.namespaces.is_archive(protocol)).ok()?;
        self.trie.find_by_url(&parsed, &self.namespaces)
    }

    fn attach_with(&mut self, node: NodeIndex, recursive: bool) -> PointerId {
        let id = self.pointers.insert(PointerRecord {
            target: RecordTarget::Node {
                family: self.trie.family(),
                node,
            },
            refcount: 1,
            recursive,
            listener: None,
        });
        self.trie.add_leaf(node, id);
        id
    }

    pub fn attach(&mut self, node: NodeIndex) -> PointerId {
        self.attach_with(node, false)
    }

    pub fn attach_recursive(&mut self, node: NodeIndex) -> PointerId {
        self.attach_with(node, true)
    }

    pub fn update(&mut self, node: NodeIndex) -> bool {
        self.trie.update(node, &self.namespaces, &mut self.pointers)
    }

    pub fn resolve_all(&mut self) -> usize {
        self.trie.resolve_all(&self.namespaces, &mut self.pointers)
    }

    pub fn force_case_sensitive(&mut self, node: NodeIndex) {
        self.trie.apply_case_rule(node, true, &mut self.pointers);
    }

    /// Consistency check that tolerates nodes without pointers.
    pub fn assert_consistent(&mut self) {
        let mut stack = vec![self.trie.root()];
        let mut empty = Vec::new();
        while let Some(index) = stack.pop() {
            let node = self.trie.node(index).expect("reachable node");
            if index != self.trie.root() && node.leaves.is_empty() {
                empty.push(index);
            }
            stack.extend(node.children.iter().copied());
        }
        // Bare tries keep nodes alive without leaves; pin them for the walk.
        let pins: Vec<(NodeIndex, PointerId)> =
            empty.into_iter().map(|node| (node, self.attach(node))).collect();
        let result = self
            .trie
            .check_consistency(&self.pointers, &CancellationToken::noop());
        for (node, id) in pins {
            self.trie.remove_leaf(node, id);
            self.pointers.remove(id);
        }
        assert_eq!(result, Ok(true));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Before,
    After,
}

/// Records every callback with the urls it carried.
#[derive(Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<(Phase, Vec<String>)>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(Phase, Vec<String>)> {
        self.calls.lock().clone()
    }

    pub fn afters(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter(|(phase, _)| *phase == Phase::After)
            .map(|(_, urls)| urls.clone())
            .collect()
    }

    pub fn befores(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter(|(phase, _)| *phase == Phase::Before)
            .map(|(_, urls)| urls.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, phase: Phase, pointers: &[FilePointer]) {
        let mut urls: Vec<String> = pointers.iter().map(FilePointer::url).collect();
        urls.sort();
        self.calls.lock().push((phase, urls));
    }
}

impl PointerListener for RecordingListener {
    fn before_validity_changed(&self, pointers: &[FilePointer]) {
        self.record(Phase::Before, pointers);
    }

    fn validity_changed(&self, pointers: &[FilePointer]) {
        self.record(Phase::After, pointers);
    }
}
