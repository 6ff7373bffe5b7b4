//! String interning pool for path segment names.
//!
//! Trie nodes store their segment name as an interned `&'static str`, so the
//! thousands of nodes named `src`, `lib` or `Cargo.toml` share one copy.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use parking_lot::Mutex;

/// Global name pool for trie segment names.
///
/// The pool is never dropped, so every `&'static str` it hands out stays valid.
pub static NAME_POOL: LazyLock<NamePool> = LazyLock::new(NamePool::new);

/// A pool that interns strings, storing each unique string exactly once.
pub struct NamePool {
    inner: Mutex<BTreeSet<Box<str>>>,
}

impl std::fmt::Debug for NamePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamePool")
            .field("len", &self.inner.lock().len())
            .finish()
    }
}

impl Default for NamePool {
    fn default() -> Self {
        Self::new()
    }
}

impl NamePool {
    /// Creates a new empty name pool.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeSet::new()),
        }
    }

    /// Interns a string into the pool, returning a reference to the stored string.
    ///
    /// # Safety
    ///
    /// The returned `&'static str` is sound because the `Box<str>` allocations
    /// are never removed from the set and never moved (only the boxes move
    /// when the tree rebalances, not their heap data). Pools must therefore be
    /// long-lived; the crate only ever uses the global `NAME_POOL`.
    pub fn intern(&self, name: &str) -> &'static str {
        let mut inner = self.inner.lock();
        if !inner.contains(name) {
            inner.insert(name.into());
        }
        let Some(existing) = inner.get(name) else {
            unreachable!("name was just inserted");
        };
        // SAFETY: see method docs; the boxed data lives as long as the pool.
        unsafe {
            std::str::from_utf8_unchecked(std::slice::from_raw_parts(
                existing.as_ptr(),
                existing.len(),
            ))
        }
    }

    /// Returns the number of distinct interned names.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
