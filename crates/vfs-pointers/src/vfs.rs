//! Namespace abstractions the pointer engine consumes.
//!
//! - `file`: file handles and namespace traits
//! - `events`: mutation event batches and their anchors
//! - `memory`: in-memory namespace for temporary files and tests
//! - `url`: url parsing and path normalization

pub mod events;
pub mod file;
pub mod memory;
pub mod namespaces;
pub mod url;

pub use events::{Anchor, BulkFileListener, FileEvent};
pub use file::{
    ancestry, file_path, file_url, parent_across_mounts, same_file, segment_name, FileId, FileRef,
    Namespace, NamespaceKind, VirtualFile,
};
pub use memory::{MemoryFs, MemoryFsError};
pub use namespaces::{NamespaceTable, TrieFamily};
pub use url::ParsedUrl;
