//! Path trie holding pointer registrations.
//!
//! - `node`: node types and the resolved/unresolved target union
//! - `leaves`: pointer ids attached to a node
//! - `root`: lookup, creation and pruning
//! - `update`: promotion, demotion and relocation after namespace changes
//! - `relevant`: pointers affected by a mutation anchor
//! - `consistency`: invariant walk used by tests and debug builds

mod consistency;
mod leaves;
mod node;
mod relevant;
mod root;
mod update;

pub use leaves::Leaves;
pub use node::{NodeFlags, NodeTarget, TrieNode};
pub use relevant::Relevant;
pub use root::TrieRoot;
