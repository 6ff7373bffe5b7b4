//! File handle and namespace abstractions consumed by the pointer trie.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::url::{push_segment, to_url, ARCHIVE_SEPARATOR, ROOT_SEGMENT};

/// Stable identity of a file within its namespace.
pub type FileId = u64;

/// Shared handle to a live (or formerly live) file.
pub type FileRef = Arc<dyn VirtualFile>;

/// A file handle with stable identity.
///
/// Handles keep answering `name()` and `parent()` after the file was deleted,
/// so events about deleted files can still be anchored.
pub trait VirtualFile: Send + Sync + fmt::Debug {
    fn id(&self) -> FileId;

    fn name(&self) -> String;

    fn parent(&self) -> Option<FileRef>;

    /// For the root of a mounted archive, the file the archive is mounted on.
    fn mount_host(&self) -> Option<FileRef> {
        None
    }

    fn is_valid(&self) -> bool;

    fn is_directory(&self) -> bool;

    /// Whether child names of this directory compare case-sensitively.
    fn is_case_sensitive(&self) -> bool;

    fn protocol(&self) -> &str;

    /// Direct lookup of a child by name, without listing the directory.
    fn find_child(&self, name: &str) -> Option<FileRef>;
}

/// Which trie family a namespace's pointers live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    /// Long-lived namespaces such as the local disk.
    Persistent,
    /// Archives mounted on files of a persistent namespace.
    Archive,
    /// Temporary namespaces whose paths may collide with persistent ones.
    Ephemeral,
}

/// A namespace implementation the registry can resolve pointers against.
pub trait Namespace: Send + Sync + fmt::Debug {
    fn protocol(&self) -> &str;

    fn kind(&self) -> NamespaceKind;

    /// Case rule for directories whose own rule is not yet known.
    fn is_case_sensitive(&self) -> bool;

    /// The namespace root directory; archives have none.
    fn root(&self) -> Option<FileRef>;

    /// The archive root mounted on `host`, for archive namespaces.
    fn mount(&self, _host: &FileRef) -> Option<FileRef> {
        None
    }

    /// Protocol of the namespace archive hosts live in.
    fn host_protocol(&self) -> Option<&str> {
        None
    }
}

pub fn same_file(a: &dyn VirtualFile, b: &dyn VirtualFile) -> bool {
    a.id() == b.id() && a.protocol() == b.protocol()
}

/// Parent of `file`, stepping from an archive root to its host file.
pub fn parent_across_mounts(file: &dyn VirtualFile) -> Option<FileRef> {
    file.parent().or_else(|| file.mount_host())
}

/// The trie segment name standing for `file`.
pub fn segment_name(file: &dyn VirtualFile) -> Cow<'static, str> {
    if file.parent().is_some() {
        Cow::Owned(file.name())
    } else if file.mount_host().is_some() {
        Cow::Borrowed(ARCHIVE_SEPARATOR)
    } else {
        Cow::Borrowed(ROOT_SEGMENT)
    }
}

/// Chain of files from the outermost namespace root down to `file`.
pub fn ancestry(file: &FileRef) -> Vec<FileRef> {
    let mut chain = vec![file.clone()];
    let mut current = file.clone();
    while let Some(parent) = parent_across_mounts(current.as_ref()) {
        chain.push(parent.clone());
        current = parent;
    }
    chain.reverse();
    chain
}

pub fn file_path(file: &FileRef) -> String {
    let mut path = String::new();
    for ancestor in ancestry(file) {
        push_segment(&mut path, &segment_name(ancestor.as_ref()));
    }
    path
}

pub fn file_url(file: &FileRef) -> String {
    to_url(file.protocol(), &file_path(file))
}
