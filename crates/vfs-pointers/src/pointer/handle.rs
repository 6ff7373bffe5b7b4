//! The externally visible pointer handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::listener::ListenerId;
use super::table::PointerId;
use crate::error::{PointerError, Result};
use crate::registry::{PointerRegistry, Shared};
use crate::vfs::url::{file_name_of, split_url, DEFAULT_PROTOCOL};
use crate::vfs::{file_url, FileRef};

/// What a pointer is created for.
#[derive(Debug, Clone)]
pub enum PointerTarget {
    Url(String),
    File(FileRef),
}

impl PointerTarget {
    pub fn url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(file) => file_url(file),
        }
    }
}

impl From<&str> for PointerTarget {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for PointerTarget {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<FileRef> for PointerTarget {
    fn from(file: FileRef) -> Self {
        Self::File(file)
    }
}

impl From<&FileRef> for PointerTarget {
    fn from(file: &FileRef) -> Self {
        Self::File(file.clone())
    }
}

struct PointerInner {
    id: PointerId,
    listener: Option<ListenerId>,
    shared: Arc<Shared>,
}

/// A stable reference to a location that may or may not exist.
///
/// Cloning the handle does not add a reference; references are counted by
/// the registry and released through `dispose` or the owning scope.
#[derive(Clone)]
pub struct FilePointer {
    inner: Arc<PointerInner>,
}

impl FilePointer {
    pub(crate) fn new(id: PointerId, listener: Option<ListenerId>, shared: Arc<Shared>) -> Self {
        Self {
            inner: Arc::new(PointerInner {
                id,
                listener,
                shared,
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> PointerId {
        self.inner.id
    }

    #[inline]
    pub fn listener(&self) -> Option<ListenerId> {
        self.inner.listener
    }

    pub fn registry(&self) -> PointerRegistry {
        PointerRegistry::from_shared(self.inner.shared.clone())
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.inner.shared
    }

    /// Current url, or an error once disposed.
    pub fn try_url(&self) -> Result<String> {
        self.inner
            .shared
            .state
            .lock()
            .pointer_url(self.id())
            .ok_or_else(|| PointerError::Disposed(self.id().to_string()))
    }

    /// Current url; empty (and logged) once disposed.
    pub fn url(&self) -> String {
        self.try_url().unwrap_or_else(|err| {
            log::error!("{err}");
            String::new()
        })
    }

    /// The file, if it exists and its handle is still valid.
    pub fn file(&self) -> Option<FileRef> {
        match self.inner.shared.state.lock().pointer_file(self.id()) {
            Some(file) => file,
            None => {
                log::error!("{}", PointerError::Disposed(self.id().to_string()));
                None
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner
            .shared
            .state
            .lock()
            .pointer_file(self.id())
            .flatten()
            .is_some()
    }

    pub fn is_recursive(&self) -> bool {
        self.inner
            .shared
            .state
            .lock()
            .pointers
            .get(self.id())
            .is_some_and(|record| record.recursive)
    }

    pub fn is_disposed(&self) -> bool {
        !self.inner.shared.state.lock().pointers.contains(self.id())
    }

    /// Last path segment of the url.
    pub fn file_name(&self) -> String {
        file_name_of(&self.url()).to_string()
    }

    /// The url as shown to users: a plain path for local files.
    pub fn presentable_url(&self) -> String {
        let url = self.url();
        if let (DEFAULT_PROTOCOL, path) = split_url(&url) {
            return path.to_string();
        }
        url
    }

    /// Drops one reference; the last one detaches the pointer from the trie.
    ///
    /// Disposing an already disposed pointer is always an error.
    pub fn dispose(&self) -> Result<()> {
        self.inner.shared.release(&[(self.id(), 1)])
    }
}

impl PartialEq for FilePointer {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for FilePointer {}

impl Hash for FilePointer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for FilePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePointer")
            .field("id", &self.id())
            .field("listener", &self.listener())
            .finish()
    }
}
