//! Pointer handles and their owners.
//!
//! - `FilePointer`: handle to one registered location
//! - `PointerScope`: batches reference releases for an owner
//! - `PointerGroup`: ordered pointer list with cached views
//! - `PointerTable`: registry-side reference counts and trie links

mod group;
mod handle;
mod listener;
mod scope;
mod table;

pub use group::PointerGroup;
pub use handle::{FilePointer, PointerTarget};
pub use listener::{ListenerId, PointerListener};
pub use scope::PointerScope;
pub use table::{PointerId, PointerRecord, PointerTable, RecordTarget};
