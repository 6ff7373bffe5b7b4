//! Notification plans computed under the lock and dispatched outside it.

use std::sync::Arc;

use fnv::{FnvHashMap, FnvHashSet};

use super::state::State;
use super::Shared;
use crate::pointer::{FilePointer, ListenerId, PointerId, PointerListener};
use crate::storage::NodeIndex;
use crate::trie::Relevant;
use crate::vfs::{FileEvent, TrieFamily};

/// Pointers and nodes one event batch affects, as seen at `version`.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventPlan {
    pub version: u64,
    /// Affected pointers, deduplicated, in discovery order.
    pub pointers: Vec<PointerId>,
    pub to_update: Vec<(TrieFamily, NodeIndex)>,
}

impl EventPlan {
    pub fn collect(state: &State, events: &[FileEvent]) -> Self {
        let mut relevant = [
            (TrieFamily::Persistent, Relevant::default()),
            (TrieFamily::Ephemeral, Relevant::default()),
        ];
        for event in events {
            let Some(family) = state.namespaces.family_of(event.protocol()) else {
                continue;
            };
            let slot = match family {
                TrieFamily::Persistent => &mut relevant[0].1,
                TrieFamily::Ephemeral => &mut relevant[1].1,
            };
            for anchor in event.anchors() {
                state
                    .trie(family)
                    .collect_relevant(&anchor, &state.pointers, slot);
            }
        }

        let mut plan = EventPlan {
            version: state.version,
            ..Default::default()
        };
        let mut seen_pointers = FnvHashSet::default();
        let mut seen_nodes = FnvHashSet::default();
        for (family, relevant) in relevant {
            for id in relevant.pointers {
                if seen_pointers.insert(id) {
                    plan.pointers.push(id);
                }
            }
            for node in relevant.to_update {
                if seen_nodes.insert((family, node)) {
                    plan.to_update.push((family, node));
                }
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty() && self.to_update.is_empty()
    }
}

/// One callback invocation: a listener and the exact pointers it hears about.
pub(crate) struct Notification {
    pub listener: Arc<dyn PointerListener>,
    pub pointers: Vec<FilePointer>,
}

/// Groups `ids` by listener in first-seen order, then adds one aggregate
/// notification per subscriber. Disposed ids are skipped and folded ids
/// report their surviving pointer once.
pub(crate) fn notifications(state: &State, shared: &Arc<Shared>, ids: &[PointerId]) -> Vec<Notification> {
    let mut slots: FnvHashMap<ListenerId, usize> = FnvHashMap::default();
    let mut by_listener: Vec<(ListenerId, Vec<FilePointer>)> = Vec::new();
    let mut all = Vec::with_capacity(ids.len());
    let mut seen = FnvHashSet::default();

    for &id in ids {
        let Some(id) = state.pointers.resolve(id) else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let Some(record) = state.pointers.get(id) else {
            continue;
        };
        let pointer = FilePointer::new(id, record.listener, shared.clone());
        if let Some(listener) = record.listener {
            let slot = *slots.entry(listener).or_insert_with(|| {
                by_listener.push((listener, Vec::new()));
                by_listener.len() - 1
            });
            by_listener[slot].1.push(pointer.clone());
        }
        all.push(pointer);
    }

    let mut out = Vec::new();
    for (listener, pointers) in by_listener {
        if let Some(listener) = state.listeners.get(listener) {
            out.push(Notification {
                listener: listener.clone(),
                pointers,
            });
        }
    }
    if !all.is_empty() {
        for listener in state.listeners.global() {
            out.push(Notification {
                listener: listener.clone(),
                pointers: all.clone(),
            });
        }
    }
    out
}
