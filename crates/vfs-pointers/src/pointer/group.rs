//! Ordered pointer collections with cached views.

use parking_lot::Mutex;

use super::handle::{FilePointer, PointerTarget};
use super::listener::ListenerId;
use super::scope::PointerScope;
use crate::error::Result;
use crate::registry::PointerRegistry;
use crate::vfs::FileRef;

#[derive(Debug, Clone)]
struct GroupViews {
    modification_count: u64,
    urls: Vec<String>,
    files: Vec<FileRef>,
    directories: Vec<FileRef>,
}

/// An ordered list of pointers owning one reference to each.
///
/// Views are memoized until the list changes or the registry reports a
/// validity change.
pub struct PointerGroup {
    registry: PointerRegistry,
    scope: PointerScope,
    listener: Option<ListenerId>,
    pointers: Vec<FilePointer>,
    views: Mutex<Option<GroupViews>>,
}

impl PointerGroup {
    pub(crate) fn new(registry: PointerRegistry, listener: Option<ListenerId>) -> Self {
        let scope = registry.scope();
        Self {
            registry,
            scope,
            listener,
            pointers: Vec::new(),
            views: Mutex::new(None),
        }
    }

    pub fn listener(&self) -> Option<ListenerId> {
        self.listener
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn pointers(&self) -> &[FilePointer] {
        &self.pointers
    }

    /// Appends a pointer for `target`, or returns the one already held for
    /// the same url.
    pub fn add(&mut self, target: impl Into<PointerTarget>) -> Result<FilePointer> {
        self.add_with(target.into(), false)
    }

    /// Like `add`, for directories whose subtree changes should be reported.
    pub fn add_directory(&mut self, target: impl Into<PointerTarget>, recursive: bool) -> Result<FilePointer> {
        self.add_with(target.into(), recursive)
    }

    fn add_with(&mut self, target: PointerTarget, recursive: bool) -> Result<FilePointer> {
        if let Some(existing) = self.find_by_url(&target.url()) {
            return Ok(existing.clone());
        }
        let pointer =
            self.registry
                .create_pointer(target, Some(&self.scope), self.listener, recursive)?;
        self.push_or_reuse(pointer)
    }

    /// Appends a pointer to the location of `pointer`, owned by this group.
    pub fn add_pointer(&mut self, pointer: &FilePointer) -> Result<FilePointer> {
        let copy = self
            .registry
            .duplicate_pointer(pointer, Some(&self.scope), self.listener)?;
        self.push_or_reuse(copy)
    }

    /// Keeps a freshly referenced pointer, unless the group already holds
    /// one at the same location; then the new reference is returned.
    fn push_or_reuse(&mut self, pointer: FilePointer) -> Result<FilePointer> {
        let url = pointer.url();
        let held = self
            .pointers
            .iter()
            .find(|held| **held == pointer || held.url() == url)
            .cloned();
        if let Some(held) = held {
            self.scope.release_one(&pointer)?;
            return Ok(held);
        }
        self.pointers.push(pointer.clone());
        self.invalidate();
        Ok(pointer)
    }

    /// Removes `pointer` and returns the group's reference to it.
    pub fn remove(&mut self, pointer: &FilePointer) -> Result<bool> {
        let Some(pos) = self.pointers.iter().position(|held| held == pointer) else {
            return Ok(false);
        };
        let removed = self.pointers.remove(pos);
        self.invalidate();
        self.scope.release_one(&removed)
    }

    /// Swaps the pointer at `index` with its predecessor.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.pointers.len() {
            return false;
        }
        self.pointers.swap(index - 1, index);
        self.invalidate();
        true
    }

    /// Swaps the pointer at `index` with its successor.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.pointers.len() {
            return false;
        }
        self.pointers.swap(index, index + 1);
        self.invalidate();
        true
    }

    /// Removes every pointer, reporting the first release failure.
    pub fn clear(&mut self) -> Result<()> {
        let mut first_error = None;
        for pointer in std::mem::take(&mut self.pointers) {
            if let Err(err) = self.scope.release_one(&pointer) {
                first_error.get_or_insert(err);
            }
        }
        self.invalidate();
        first_error.map_or(Ok(()), Err)
    }

    pub fn find_by_url(&self, url: &str) -> Option<&FilePointer> {
        let urls = self.urls();
        let pos = urls.iter().position(|held| held == url)?;
        self.pointers.get(pos)
    }

    pub fn urls(&self) -> Vec<String> {
        self.views().urls
    }

    /// Valid files, in group order.
    pub fn files(&self) -> Vec<FileRef> {
        self.views().files
    }

    /// Valid directories, in group order.
    pub fn directories(&self) -> Vec<FileRef> {
        self.views().directories
    }

    /// A new group in its own scope with equivalent pointers.
    pub fn duplicate(&self, listener: Option<ListenerId>) -> Result<PointerGroup> {
        let mut copy = PointerGroup::new(self.registry.clone(), listener);
        for pointer in &self.pointers {
            let duplicated = self
                .registry
                .duplicate_pointer(pointer, Some(&copy.scope), listener)?;
            copy.pointers.push(duplicated);
        }
        Ok(copy)
    }

    fn invalidate(&self) {
        *self.views.lock() = None;
    }

    fn views(&self) -> GroupViews {
        let modification_count = self.registry.modification_count();
        let mut cached = self.views.lock();
        if let Some(views) = cached.as_ref() {
            if views.modification_count == modification_count {
                return views.clone();
            }
        }
        let mut views = GroupViews {
            modification_count,
            urls: Vec::with_capacity(self.pointers.len()),
            files: Vec::new(),
            directories: Vec::new(),
        };
        for pointer in &self.pointers {
            views.urls.push(pointer.url());
            if let Some(file) = pointer.file() {
                if file.is_directory() {
                    views.directories.push(file.clone());
                }
                views.files.push(file);
            }
        }
        *cached = Some(views.clone());
        views
    }
}

impl PartialEq for PointerGroup {
    fn eq(&self, other: &Self) -> bool {
        self.urls() == other.urls()
    }
}

impl std::fmt::Debug for PointerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerGroup")
            .field("listener", &self.listener)
            .field("pointers", &self.pointers)
            .finish()
    }
}
