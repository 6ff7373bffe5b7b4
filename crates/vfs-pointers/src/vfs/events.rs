//! Mutation events delivered to the pointer registry in batches.

use std::borrow::Cow;

use super::file::{parent_across_mounts, segment_name, FileRef};

/// One namespace mutation.
#[derive(Debug, Clone)]
pub enum FileEvent {
    Create {
        parent: FileRef,
        name: String,
        is_directory: bool,
    },
    Delete {
        file: FileRef,
    },
    Copy {
        file: FileRef,
        new_parent: FileRef,
        new_name: String,
    },
    Move {
        file: FileRef,
        old_parent: FileRef,
        new_parent: FileRef,
    },
    Rename {
        file: FileRef,
        old_name: String,
        new_name: String,
    },
    ContentChange {
        file: FileRef,
    },
}

/// The (parent, child name) pair an event is resolved to before trie lookup.
#[derive(Debug, Clone)]
pub struct Anchor {
    pub parent: FileRef,
    pub name: String,
}

impl Anchor {
    fn new(parent: &FileRef, name: impl Into<String>) -> Self {
        Self {
            parent: parent.clone(),
            name: name.into(),
        }
    }
}

impl FileEvent {
    /// Protocol of the namespace the event happened in.
    pub fn protocol(&self) -> &str {
        match self {
            Self::Create { parent, .. } => parent.protocol(),
            Self::Delete { file }
            | Self::Copy { file, .. }
            | Self::Move { file, .. }
            | Self::Rename { file, .. }
            | Self::ContentChange { file } => file.protocol(),
        }
    }

    /// Anchors whose pointers may change validity because of this event.
    pub fn anchors(&self) -> Vec<Anchor> {
        match self {
            Self::Create { parent, name, .. } => vec![Anchor::new(parent, name.as_str())],
            Self::Delete { file } => parent_across_mounts(file.as_ref())
                .map(|parent| Anchor::new(&parent, segment_name(file.as_ref())))
                .into_iter()
                .collect(),
            Self::Copy {
                new_parent,
                new_name,
                ..
            } => vec![Anchor::new(new_parent, new_name.as_str())],
            Self::Move {
                file,
                old_parent,
                new_parent,
            } => {
                let name: Cow<'static, str> = segment_name(file.as_ref());
                vec![
                    Anchor::new(old_parent, name.as_ref()),
                    Anchor::new(new_parent, name.as_ref()),
                ]
            }
            Self::Rename {
                file,
                old_name,
                new_name,
            } => match file.parent() {
                Some(parent) => vec![
                    Anchor::new(&parent, old_name.as_str()),
                    Anchor::new(&parent, new_name.as_str()),
                ],
                None => Vec::new(),
            },
            Self::ContentChange { .. } => Vec::new(),
        }
    }
}

/// Receiver of event batches, called before and after the batch is applied.
///
/// A namespace passes the same slice to both calls of one batch; the
/// registry pairs the two phases by it.
pub trait BulkFileListener: Send + Sync {
    fn before(&self, events: &[FileEvent]);

    fn after(&self, events: &[FileEvent]);
}
