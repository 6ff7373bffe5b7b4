//! Scoped ownership of pointer references.

use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::Mutex;

use super::handle::FilePointer;
use super::table::PointerId;
use crate::error::Result;
use crate::registry::Shared;

/// Holds pointer references for the lifetime of some owner.
///
/// Every pointer created into a scope adds one reference to its tally.
/// Releasing the scope (explicitly or on drop) returns all of them in a
/// single locked pass, leaving pointers still referenced elsewhere alive.
pub struct PointerScope {
    shared: Arc<Shared>,
    held: Mutex<FnvHashMap<PointerId, u32>>,
}

impl PointerScope {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            held: Mutex::new(FnvHashMap::default()),
        }
    }

    pub(crate) fn belongs_to(&self, shared: &Arc<Shared>) -> bool {
        Arc::ptr_eq(&self.shared, shared)
    }

    pub(crate) fn track(&self, id: PointerId) {
        *self.held.lock().entry(id).or_insert(0) += 1;
    }

    /// Number of distinct pointers held.
    pub fn len(&self) -> usize {
        self.held.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.lock().is_empty()
    }

    pub fn holds(&self, pointer: &FilePointer) -> bool {
        self.held.lock().contains_key(&pointer.id())
    }

    /// Returns one of this scope's references to `pointer`.
    ///
    /// `Ok(false)` when the scope holds no reference to it.
    pub fn release_one(&self, pointer: &FilePointer) -> Result<bool> {
        {
            let mut held = self.held.lock();
            let Some(count) = held.get_mut(&pointer.id()) else {
                return Ok(false);
            };
            *count -= 1;
            if *count == 0 {
                held.remove(&pointer.id());
            }
        }
        self.shared.release(&[(pointer.id(), 1)])?;
        Ok(true)
    }

    /// Returns every reference held, reporting the first failure.
    pub fn release(self) -> Result<()> {
        self.release_all()
    }

    fn release_all(&self) -> Result<()> {
        let held = std::mem::take(&mut *self.held.lock());
        if held.is_empty() {
            return Ok(());
        }
        let batch: Vec<(PointerId, u32)> = held.into_iter().collect();
        self.shared.release(&batch)
    }
}

impl Drop for PointerScope {
    fn drop(&mut self) {
        if let Err(err) = self.release_all() {
            log::error!("releasing pointer scope: {err}");
        }
    }
}

impl std::fmt::Debug for PointerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerScope")
            .field("held", &self.held.lock().len())
            .finish()
    }
}
