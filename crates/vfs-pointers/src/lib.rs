//! File pointers that survive namespace mutations.
//!
//! A `FilePointer` names a location by url and, while the file exists, holds
//! a live handle to it. Pointers are kept in a trie mirroring the namespace
//! tree:
//! - Nodes are resolved to live files or wait as plain urls
//! - Mutation batches re-validate only the affected subtrees
//! - Listeners hear about validity changes before and after each batch
//!
//! `PointerRegistry` is the entry point; namespaces plug in through the
//! `vfs::Namespace` trait and deliver their events via `BulkFileListener`.

pub mod cancel;
pub mod config;
pub mod error;
pub mod pointer;
pub mod registry;
pub mod storage;
pub mod trie;
pub mod vfs;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use cancel::{CancellationToken, WalkVersionTracker};
pub use config::RegistryConfig;
pub use error::{PointerError, Result};
pub use pointer::{FilePointer, ListenerId, PointerGroup, PointerListener, PointerScope, PointerTarget};
pub use registry::{PointerInfo, PointerRegistry, Subscription};
pub use vfs::{BulkFileListener, FileEvent, FileRef, MemoryFs, Namespace, NamespaceKind, VirtualFile};
