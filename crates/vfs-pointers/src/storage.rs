//! Storage primitives for the pointer trie.
//!
//! - Slab arena with compact `NodeIndex` keys
//! - Name interning pool for deduplicating segment names

mod index_types;
mod namepool;
mod slab;

pub use index_types::{NodeIndex, OptionNodeIndex};
pub use namepool::{NamePool, NAME_POOL};
pub use slab::Slab;
