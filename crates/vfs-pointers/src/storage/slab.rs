//! Heap-backed slab arena with stable `NodeIndex` keys.
//!
//! Freed slots are threaded onto a freelist and reused by later inserts, so
//! an index stays valid exactly as long as the value it was returned for.

use std::fmt;
use std::ops::{Index, IndexMut};

use super::index_types::NodeIndex;

#[derive(Debug, Clone)]
enum Entry<T> {
    /// Free slot; holds the next free slot of the freelist.
    Vacant(usize),
    Occupied(T),
}

/// Arena of `T` values addressed by `NodeIndex`.
pub struct Slab<T> {
    entries: Vec<Entry<T>>,
    /// Logical element count (occupied slots only).
    len: usize,
    /// Head of the freelist (index of the next available slot).
    next: usize,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slab<T> {
    /// Creates a new empty slab.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            len: 0,
            next: 0,
        }
    }

    /// Inserts a value, returning its stable index.
    pub fn insert(&mut self, value: T) -> NodeIndex {
        let key = self.next;
        if key == self.entries.len() {
            self.entries.push(Entry::Occupied(value));
            self.next = self.entries.len();
        } else {
            let entry = std::mem::replace(&mut self.entries[key], Entry::Occupied(value));
            self.next = match entry {
                Entry::Vacant(next) => next,
                Entry::Occupied(_) => unreachable!("freelist head points at an occupied slot"),
            };
        }
        self.len += 1;
        NodeIndex::new(key)
    }

    /// Gets a reference to the value at `index`.
    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&T> {
        match self.entries.get(index.get()) {
            Some(Entry::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Gets a mutable reference to the value at `index`.
    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut T> {
        match self.entries.get_mut(index.get()) {
            Some(Entry::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns true if `index` names an occupied slot.
    #[inline]
    pub fn contains(&self, index: NodeIndex) -> bool {
        self.get(index).is_some()
    }

    /// Removes the value at `index`, returning it if present.
    pub fn try_remove(&mut self, index: NodeIndex) -> Option<T> {
        let key = index.get();
        let slot = self.entries.get_mut(key)?;
        if matches!(slot, Entry::Vacant(_)) {
            return None;
        }
        let removed = std::mem::replace(slot, Entry::Vacant(self.next));
        self.next = key;
        self.len -= 1;
        match removed {
            Entry::Occupied(value) => Some(value),
            Entry::Vacant(_) => None,
        }
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the slab is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns an iterator over occupied entries.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| match entry {
                Entry::Occupied(value) => Some((NodeIndex::new(idx), value)),
                Entry::Vacant(_) => None,
            })
    }
}

impl<T> Index<NodeIndex> for Slab<T> {
    type Output = T;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        match self.get(index) {
            Some(value) => value,
            None => panic!("invalid slab index {index:?}"),
        }
    }
}

impl<T> IndexMut<NodeIndex> for Slab<T> {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("invalid slab index {index:?}"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Slab<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
