//! Reference counts and trie links of live pointers.

use std::fmt;

use fnv::FnvHashMap;
use serde::Serialize;

use super::listener::ListenerId;
use crate::storage::NodeIndex;
use crate::vfs::{FileRef, TrieFamily};

/// Identity of one live pointer. Ids are never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PointerId(u64);

impl PointerId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ptr#{}", self.0)
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ptr#{}", self.0)
    }
}

/// Where a pointer's location is kept.
#[derive(Debug, Clone)]
pub enum RecordTarget {
    /// Leaf of a trie node.
    Node { family: TrieFamily, node: NodeIndex },
    /// Pointer into a namespace without trie support; never moves.
    Identity { url: String, file: Option<FileRef> },
}

#[derive(Debug, Clone)]
pub struct PointerRecord {
    pub target: RecordTarget,
    pub refcount: u32,
    pub recursive: bool,
    pub listener: Option<ListenerId>,
}

impl PointerRecord {
    pub fn node(&self) -> Option<(TrieFamily, NodeIndex)> {
        match self.target {
            RecordTarget::Node { family, node } => Some((family, node)),
            RecordTarget::Identity { .. } => None,
        }
    }
}

/// Live pointer records keyed by id.
///
/// When two records are folded into one, the absorbed id stays usable as an
/// alias of the surviving id until that record is removed.
#[derive(Debug, Default)]
pub struct PointerTable {
    records: FnvHashMap<PointerId, PointerRecord>,
    aliases: FnvHashMap<PointerId, PointerId>,
    next_id: u64,
}

impl PointerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: PointerRecord) -> PointerId {
        self.next_id += 1;
        let id = PointerId(self.next_id);
        self.records.insert(id, record);
        id
    }

    /// The live id `id` stands for, following fold aliases.
    pub fn resolve(&self, id: PointerId) -> Option<PointerId> {
        let id = self.aliases.get(&id).copied().unwrap_or(id);
        self.records.contains_key(&id).then_some(id)
    }

    #[inline]
    pub fn get(&self, id: PointerId) -> Option<&PointerRecord> {
        self.records.get(&self.resolve(id)?)
    }

    #[inline]
    pub fn get_mut(&mut self, id: PointerId) -> Option<&mut PointerRecord> {
        let id = self.resolve(id)?;
        self.records.get_mut(&id)
    }

    /// Removes the record `id` stands for, along with its aliases.
    pub fn remove(&mut self, id: PointerId) -> Option<PointerRecord> {
        let id = self.resolve(id)?;
        let record = self.records.remove(&id)?;
        if !self.aliases.is_empty() {
            self.aliases.retain(|_, target| *target != id);
        }
        Some(record)
    }

    pub fn contains(&self, id: PointerId) -> bool {
        self.resolve(id).is_some()
    }

    /// Folds the record of `from` into the record of `into`: references add
    /// up, the recursive flag is or-ed, and `from` becomes an alias.
    pub fn fold(&mut self, from: PointerId, into: PointerId) {
        let (Some(from), Some(into)) = (self.resolve(from), self.resolve(into)) else {
            return;
        };
        if from == into {
            return;
        }
        let Some(absorbed) = self.records.remove(&from) else {
            return;
        };
        if let Some(record) = self.records.get_mut(&into) {
            record.refcount += absorbed.refcount;
            record.recursive |= absorbed.recursive;
        }
        for target in self.aliases.values_mut() {
            if *target == from {
                *target = into;
            }
        }
        self.aliases.insert(from, into);
    }

    /// Points `id` at a different node after trie nodes were merged.
    pub fn relink(&mut self, id: PointerId, family: TrieFamily, node: NodeIndex) {
        if let Some(record) = self.records.get_mut(&id) {
            record.target = RecordTarget::Node { family, node };
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointerId, &PointerRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }
}
