//! In-memory namespace.
//!
//! Serves as the ephemeral `temp://` namespace and as a stand-in for disk and
//! archive namespaces in tests. Every mutation is published as a batch of
//! `FileEvent`s: listeners see `before`, the tree changes, listeners see
//! `after`. Deleted entries are kept as tombstones so handles to them still
//! report their last name and parent.

use std::fmt;
use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::RwLock;

use super::events::{BulkFileListener, FileEvent};
use super::file::{FileId, FileRef, Namespace, NamespaceKind, VirtualFile};
use super::url::{names_equal, ARCHIVE_SEPARATOR, DEFAULT_PROTOCOL};

pub const TEMP_PROTOCOL: &str = "temp";
pub const JAR_PROTOCOL: &str = "jar";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryFsError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type MemoryFsResult<T> = std::result::Result<T, MemoryFsError>;

#[derive(Debug)]
struct EntryData {
    name: String,
    parent: Option<FileId>,
    children: Vec<FileId>,
    is_dir: bool,
    valid: bool,
    case_sensitive: bool,
    /// Host file, for archive roots.
    host: Option<FileRef>,
}

#[derive(Debug, Default)]
struct Tree {
    entries: FnvHashMap<FileId, EntryData>,
    next_id: FileId,
    root: Option<FileId>,
    /// Host file id -> archive root id.
    mounts: FnvHashMap<FileId, FileId>,
}

impl Tree {
    fn alloc(&mut self, data: EntryData) -> FileId {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(id, data);
        id
    }

    fn find_child_id(&self, dir: FileId, name: &str) -> Option<FileId> {
        let entry = self.entries.get(&dir)?;
        entry.children.iter().copied().find(|child| {
            self.entries
                .get(child)
                .is_some_and(|data| data.valid && names_equal(&data.name, name, entry.case_sensitive))
        })
    }

    fn is_valid(&self, mut id: FileId) -> bool {
        loop {
            let Some(entry) = self.entries.get(&id) else {
                return false;
            };
            if !entry.valid {
                return false;
            }
            match entry.parent {
                Some(parent) => id = parent,
                None => return entry.host.as_ref().map_or(true, |host| host.is_valid()),
            }
        }
    }

    fn is_ancestor_or_self(&self, ancestor: FileId, mut id: FileId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.entries.get(&id).and_then(|entry| entry.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn invalidate(&mut self, id: FileId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(entry) = self.entries.get_mut(&current) {
                entry.valid = false;
                stack.extend(entry.children.drain(..));
            }
        }
    }

    fn detach(&mut self, id: FileId) {
        let parent = self.entries.get(&id).and_then(|entry| entry.parent);
        if let Some(parent) = parent.and_then(|parent| self.entries.get_mut(&parent)) {
            parent.children.retain(|&child| child != id);
        }
    }

    fn copy_subtree(&mut self, source: FileId, parent: FileId, name: String) -> Option<FileId> {
        let (is_dir, case_sensitive, children) = {
            let entry = self.entries.get(&source)?;
            (entry.is_dir, entry.case_sensitive, entry.children.clone())
        };
        let copy = self.alloc(EntryData {
            name,
            parent: Some(parent),
            children: Vec::new(),
            is_dir,
            valid: true,
            case_sensitive,
            host: None,
        });
        self.entries.get_mut(&parent)?.children.push(copy);
        for child in children {
            let child_name = self.entries.get(&child)?.name.clone();
            self.copy_subtree(child, copy, child_name)?;
        }
        Some(copy)
    }
}

struct MemoryFsInner {
    protocol: String,
    kind: NamespaceKind,
    case_sensitive: bool,
    host_protocol: Option<String>,
    tree: RwLock<Tree>,
    listeners: RwLock<Vec<Arc<dyn BulkFileListener>>>,
}

impl fmt::Debug for MemoryFsInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFs")
            .field("protocol", &self.protocol)
            .field("kind", &self.kind)
            .field("entries", &self.tree.read().entries.len())
            .finish()
    }
}

fn handle(fs: &Arc<MemoryFsInner>, id: FileId) -> FileRef {
    Arc::new(MemoryFile {
        id,
        fs: fs.clone(),
    })
}

/// Handle to an entry of a `MemoryFs`.
pub struct MemoryFile {
    id: FileId,
    fs: Arc<MemoryFsInner>,
}

impl fmt::Debug for MemoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryFile({}#{} {:?})", self.fs.protocol, self.id, self.name())
    }
}

impl VirtualFile for MemoryFile {
    fn id(&self) -> FileId {
        self.id
    }

    fn name(&self) -> String {
        self.fs
            .tree
            .read()
            .entries
            .get(&self.id)
            .map(|entry| entry.name.clone())
            .unwrap_or_default()
    }

    fn parent(&self) -> Option<FileRef> {
        let parent = self.fs.tree.read().entries.get(&self.id)?.parent?;
        Some(handle(&self.fs, parent))
    }

    fn mount_host(&self) -> Option<FileRef> {
        self.fs.tree.read().entries.get(&self.id)?.host.clone()
    }

    fn is_valid(&self) -> bool {
        self.fs.tree.read().is_valid(self.id)
    }

    fn is_directory(&self) -> bool {
        self.fs
            .tree
            .read()
            .entries
            .get(&self.id)
            .is_some_and(|entry| entry.is_dir)
    }

    fn is_case_sensitive(&self) -> bool {
        self.fs
            .tree
            .read()
            .entries
            .get(&self.id)
            .map_or(self.fs.case_sensitive, |entry| entry.case_sensitive)
    }

    fn protocol(&self) -> &str {
        &self.fs.protocol
    }

    fn find_child(&self, name: &str) -> Option<FileRef> {
        let child = {
            let tree = self.fs.tree.read();
            if !tree.is_valid(self.id) {
                return None;
            }
            tree.find_child_id(self.id, name)?
        };
        Some(handle(&self.fs, child))
    }
}

/// An in-memory namespace; cloning shares the same tree.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    inner: Arc<MemoryFsInner>,
}

impl MemoryFs {
    pub fn new(protocol: &str, kind: NamespaceKind) -> Self {
        Self::with_options(protocol, kind, true, None)
    }

    pub fn new_case_insensitive(protocol: &str, kind: NamespaceKind) -> Self {
        Self::with_options(protocol, kind, false, None)
    }

    /// A persistent `file://` namespace.
    pub fn local() -> Self {
        Self::new(DEFAULT_PROTOCOL, NamespaceKind::Persistent)
    }

    /// An ephemeral `temp://` namespace.
    pub fn temp() -> Self {
        Self::new(TEMP_PROTOCOL, NamespaceKind::Ephemeral)
    }

    /// A `jar://` archive namespace whose archives are files of `host`.
    pub fn archive(host: &MemoryFs) -> Self {
        Self::with_options(JAR_PROTOCOL, NamespaceKind::Archive, true, Some(host.protocol()))
    }

    fn with_options(
        protocol: &str,
        kind: NamespaceKind,
        case_sensitive: bool,
        host_protocol: Option<&str>,
    ) -> Self {
        let mut tree = Tree::default();
        if kind != NamespaceKind::Archive {
            let root = tree.alloc(EntryData {
                name: String::new(),
                parent: None,
                children: Vec::new(),
                is_dir: true,
                valid: true,
                case_sensitive,
                host: None,
            });
            tree.root = Some(root);
        }
        Self {
            inner: Arc::new(MemoryFsInner {
                protocol: protocol.to_string(),
                kind,
                case_sensitive,
                host_protocol: host_protocol.map(str::to_string),
                tree: RwLock::new(tree),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn protocol(&self) -> &str {
        &self.inner.protocol
    }

    pub fn add_listener(&self, listener: Arc<dyn BulkFileListener>) {
        self.inner.listeners.write().push(listener);
    }

    pub fn root_file(&self) -> Option<FileRef> {
        let root = self.inner.tree.read().root?;
        Some(handle(&self.inner, root))
    }

    /// Looks up an absolute path; archive namespaces have no path roots.
    pub fn find(&self, path: &str) -> Option<FileRef> {
        let tree = self.inner.tree.read();
        let mut current = tree.root?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = tree.find_child_id(current, segment)?;
        }
        Some(handle(&self.inner, current))
    }

    /// Mounts an empty archive on `host`, returning the archive root.
    ///
    /// A new mount is published as the creation of the `!/` child of `host`.
    pub fn mount_archive(&self, host: &FileRef) -> MemoryFsResult<FileRef> {
        if self.inner.kind != NamespaceKind::Archive {
            return Err(MemoryFsError::InvalidOperation(format!(
                "{} is not an archive namespace",
                self.inner.protocol
            )));
        }
        if !host.is_valid() || host.is_directory() {
            return Err(MemoryFsError::InvalidFile(host.name()));
        }
        if let Some(&root) = self.inner.tree.read().mounts.get(&host.id()) {
            return Ok(handle(&self.inner, root));
        }

        let events = [FileEvent::Create {
            parent: host.clone(),
            name: ARCHIVE_SEPARATOR.to_string(),
            is_directory: true,
        }];
        let listeners: Vec<_> = self.inner.listeners.read().clone();
        for listener in &listeners {
            listener.before(&events);
        }
        let root = {
            let mut tree = self.inner.tree.write();
            let root = tree.alloc(EntryData {
                name: host.name(),
                parent: None,
                children: Vec::new(),
                is_dir: true,
                valid: true,
                case_sensitive: self.inner.case_sensitive,
                host: Some(host.clone()),
            });
            tree.mounts.insert(host.id(), root);
            root
        };
        for listener in &listeners {
            listener.after(&events);
        }
        Ok(handle(&self.inner, root))
    }

    /// Changes the case rule of a directory without firing events.
    pub fn set_case_sensitive(&self, dir: &FileRef, case_sensitive: bool) -> MemoryFsResult<()> {
        let mut tree = self.inner.tree.write();
        let entry = self.owned_entry_mut(&mut tree, dir)?;
        entry.case_sensitive = case_sensitive;
        Ok(())
    }

    pub fn create_file(&self, path: &str) -> MemoryFsResult<FileRef> {
        let (parent, name) = self.split_parent(path)?;
        self.create_child(&parent, name, false)
    }

    pub fn create_dir(&self, path: &str) -> MemoryFsResult<FileRef> {
        let (parent, name) = self.split_parent(path)?;
        self.create_child(&parent, name, true)
    }

    /// Creates every missing directory along `path`, one batch per directory.
    pub fn create_dirs(&self, path: &str) -> MemoryFsResult<FileRef> {
        let mut current = self
            .root_file()
            .ok_or_else(|| MemoryFsError::NotFound(path.to_string()))?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = match current.find_child(segment) {
                Some(child) => child,
                None => self.create_child(&current, segment, true)?,
            };
        }
        Ok(current)
    }

    pub fn create_child(
        &self,
        parent: &FileRef,
        name: &str,
        is_directory: bool,
    ) -> MemoryFsResult<FileRef> {
        self.apply(vec![FileEvent::Create {
            parent: parent.clone(),
            name: name.to_string(),
            is_directory,
        }])?;
        parent
            .find_child(name)
            .ok_or_else(|| MemoryFsError::NotFound(name.to_string()))
    }

    pub fn delete(&self, file: &FileRef) -> MemoryFsResult<()> {
        self.apply(vec![FileEvent::Delete { file: file.clone() }])
    }

    pub fn rename(&self, file: &FileRef, new_name: &str) -> MemoryFsResult<()> {
        self.apply(vec![FileEvent::Rename {
            file: file.clone(),
            old_name: file.name(),
            new_name: new_name.to_string(),
        }])
    }

    pub fn move_to(&self, file: &FileRef, new_parent: &FileRef) -> MemoryFsResult<()> {
        let old_parent = file
            .parent()
            .ok_or_else(|| MemoryFsError::InvalidOperation("cannot move a root".to_string()))?;
        self.apply(vec![FileEvent::Move {
            file: file.clone(),
            old_parent,
            new_parent: new_parent.clone(),
        }])
    }

    pub fn copy(
        &self,
        file: &FileRef,
        new_parent: &FileRef,
        new_name: &str,
    ) -> MemoryFsResult<FileRef> {
        self.apply(vec![FileEvent::Copy {
            file: file.clone(),
            new_parent: new_parent.clone(),
            new_name: new_name.to_string(),
        }])?;
        new_parent
            .find_child(new_name)
            .ok_or_else(|| MemoryFsError::NotFound(new_name.to_string()))
    }

    /// Publishes and applies one batch of events.
    ///
    /// Every event is validated against the current tree before listeners
    /// hear about the batch; listeners run outside the tree lock.
    pub fn apply(&self, events: Vec<FileEvent>) -> MemoryFsResult<()> {
        {
            let tree = self.inner.tree.read();
            for event in &events {
                self.validate(&tree, event)?;
            }
        }

        let listeners: Vec<_> = self.inner.listeners.read().clone();
        for listener in &listeners {
            listener.before(&events);
        }

        let mut result = Ok(());
        {
            let mut tree = self.inner.tree.write();
            for event in &events {
                if let Err(error) = self.apply_event(&mut tree, event) {
                    result = Err(error);
                    break;
                }
            }
        }

        for listener in &listeners {
            listener.after(&events);
        }
        result
    }

    fn split_parent<'a>(&self, path: &'a str) -> MemoryFsResult<(FileRef, &'a str)> {
        let trimmed = path.trim_end_matches('/');
        let pos = trimmed
            .rfind('/')
            .ok_or_else(|| MemoryFsError::NotFound(path.to_string()))?;
        let parent = self
            .find(&trimmed[..pos])
            .ok_or_else(|| MemoryFsError::NotFound(trimmed[..pos].to_string()))?;
        Ok((parent, &trimmed[pos + 1..]))
    }

    fn owned_id(&self, tree: &Tree, file: &FileRef) -> MemoryFsResult<FileId> {
        if file.protocol() != self.inner.protocol || !tree.entries.contains_key(&file.id()) {
            return Err(MemoryFsError::InvalidFile(format!("{file:?}")));
        }
        Ok(file.id())
    }

    fn owned_entry_mut<'t>(
        &self,
        tree: &'t mut Tree,
        file: &FileRef,
    ) -> MemoryFsResult<&'t mut EntryData> {
        let id = self.owned_id(tree, file)?;
        tree.entries
            .get_mut(&id)
            .ok_or_else(|| MemoryFsError::InvalidFile(format!("{file:?}")))
    }

    fn live_dir(&self, tree: &Tree, dir: &FileRef) -> MemoryFsResult<FileId> {
        let id = self.owned_id(tree, dir)?;
        if !tree.is_valid(id) {
            return Err(MemoryFsError::InvalidFile(format!("{dir:?}")));
        }
        if !tree.entries.get(&id).is_some_and(|entry| entry.is_dir) {
            return Err(MemoryFsError::NotADirectory(format!("{dir:?}")));
        }
        Ok(id)
    }

    fn live_child(&self, tree: &Tree, file: &FileRef) -> MemoryFsResult<(FileId, FileId)> {
        let id = self.owned_id(tree, file)?;
        if !tree.is_valid(id) {
            return Err(MemoryFsError::InvalidFile(format!("{file:?}")));
        }
        let parent = tree
            .entries
            .get(&id)
            .and_then(|entry| entry.parent)
            .ok_or_else(|| MemoryFsError::InvalidOperation("cannot modify a root".to_string()))?;
        Ok((id, parent))
    }

    fn check_free(&self, tree: &Tree, dir: FileId, name: &str, except: Option<FileId>) -> MemoryFsResult<()> {
        if name.is_empty() || name.contains('/') {
            return Err(MemoryFsError::InvalidOperation(format!("bad name {name:?}")));
        }
        match tree.find_child_id(dir, name) {
            Some(existing) if Some(existing) != except => {
                Err(MemoryFsError::AlreadyExists(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn validate(&self, tree: &Tree, event: &FileEvent) -> MemoryFsResult<()> {
        match event {
            FileEvent::Create { parent, name, .. } => {
                let dir = self.live_dir(tree, parent)?;
                self.check_free(tree, dir, name, None)
            }
            FileEvent::Delete { file } => self.live_child(tree, file).map(|_| ()),
            FileEvent::Copy {
                file,
                new_parent,
                new_name,
            } => {
                self.live_child(tree, file)?;
                let dir = self.live_dir(tree, new_parent)?;
                self.check_free(tree, dir, new_name, None)
            }
            FileEvent::Move {
                file,
                old_parent,
                new_parent,
            } => {
                let (id, parent) = self.live_child(tree, file)?;
                if parent != old_parent.id() {
                    return Err(MemoryFsError::InvalidOperation(format!(
                        "{file:?} is not a child of {old_parent:?}"
                    )));
                }
                let dir = self.live_dir(tree, new_parent)?;
                if tree.is_ancestor_or_self(id, dir) {
                    return Err(MemoryFsError::InvalidOperation(format!(
                        "cannot move {file:?} into itself"
                    )));
                }
                let name = tree.entries.get(&id).map(|entry| entry.name.as_str()).unwrap_or("");
                self.check_free(tree, dir, name, None)
            }
            FileEvent::Rename {
                file,
                old_name,
                new_name,
            } => {
                let (id, parent) = self.live_child(tree, file)?;
                if tree.entries.get(&id).map(|entry| entry.name.as_str()) != Some(old_name.as_str()) {
                    return Err(MemoryFsError::InvalidOperation(format!(
                        "{file:?} is not named {old_name}"
                    )));
                }
                self.check_free(tree, parent, new_name, Some(id))
            }
            FileEvent::ContentChange { file } => self.live_child(tree, file).map(|_| ()),
        }
    }

    fn apply_event(&self, tree: &mut Tree, event: &FileEvent) -> MemoryFsResult<()> {
        self.validate(tree, event)?;
        match event {
            FileEvent::Create {
                parent,
                name,
                is_directory,
            } => {
                let parent_id = parent.id();
                let child = tree.alloc(EntryData {
                    name: name.clone(),
                    parent: Some(parent_id),
                    children: Vec::new(),
                    is_dir: *is_directory,
                    valid: true,
                    case_sensitive: self.inner.case_sensitive,
                    host: None,
                });
                if let Some(parent) = tree.entries.get_mut(&parent_id) {
                    parent.children.push(child);
                }
            }
            FileEvent::Delete { file } => {
                tree.detach(file.id());
                tree.invalidate(file.id());
            }
            FileEvent::Copy {
                file,
                new_parent,
                new_name,
            } => {
                tree.copy_subtree(file.id(), new_parent.id(), new_name.clone())
                    .ok_or_else(|| MemoryFsError::InvalidFile(format!("{file:?}")))?;
            }
            FileEvent::Move {
                file, new_parent, ..
            } => {
                let id = file.id();
                tree.detach(id);
                if let Some(entry) = tree.entries.get_mut(&id) {
                    entry.parent = Some(new_parent.id());
                }
                if let Some(parent) = tree.entries.get_mut(&new_parent.id()) {
                    parent.children.push(id);
                }
            }
            FileEvent::Rename { file, new_name, .. } => {
                if let Some(entry) = tree.entries.get_mut(&file.id()) {
                    entry.name = new_name.clone();
                }
            }
            FileEvent::ContentChange { .. } => {}
        }
        Ok(())
    }
}

impl Namespace for MemoryFs {
    fn protocol(&self) -> &str {
        &self.inner.protocol
    }

    fn kind(&self) -> NamespaceKind {
        self.inner.kind
    }

    fn is_case_sensitive(&self) -> bool {
        self.inner.case_sensitive
    }

    fn root(&self) -> Option<FileRef> {
        self.root_file()
    }

    fn mount(&self, host: &FileRef) -> Option<FileRef> {
        if self.inner.host_protocol.as_deref() != Some(host.protocol()) || !host.is_valid() {
            return None;
        }
        let root = *self.inner.tree.read().mounts.get(&host.id())?;
        Some(handle(&self.inner, root))
    }

    fn host_protocol(&self) -> Option<&str> {
        self.inner.host_protocol.as_deref()
    }
}
