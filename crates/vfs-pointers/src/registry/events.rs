//! The two-phase event pipeline.
//!
//! `before` collects a plan under the lock and fires before-callbacks
//! outside it. `after` re-validates the anchor nodes, bumps the modification
//! count and fires after-callbacks. When pointers changed in between, the
//! plan is recollected first; pointers that only show up then get their
//! before-callback late rather than not at all.
//!
//! Batches from independent namespaces may overlap, so every plan is kept
//! under the identity of the event slice it was collected for.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use fnv::FnvHashSet;

use super::plan::{notifications, EventPlan, Notification};
use super::{PointerRegistry, Shared};
use crate::cancel::CancellationToken;
use crate::pointer::PointerId;
use crate::vfs::{BulkFileListener, FileEvent};

/// Identity of one event batch: the slice a namespace hands to both phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchKey {
    addr: usize,
    len: usize,
}

impl BatchKey {
    fn of(events: &[FileEvent]) -> Self {
        Self {
            addr: events.as_ptr() as usize,
            len: events.len(),
        }
    }
}

impl Shared {
    pub(crate) fn before(self: &Arc<Self>, events: &[FileEvent]) {
        let (plan, to_fire) = {
            let state = self.state.lock();
            let plan = EventPlan::collect(&state, events);
            let to_fire = notifications(&state, self, &plan.pointers);
            (plan, to_fire)
        };
        if !plan.is_empty() {
            log::debug!(
                "{} events touch {} pointers and {} nodes",
                events.len(),
                plan.pointers.len(),
                plan.to_update.len()
            );
        }
        fire_before(&to_fire);
        self.pending.lock().push((BatchKey::of(events), plan));
    }

    /// Takes the plan of the most recent unfinished batch over `events`.
    fn take_pending(&self, events: &[FileEvent]) -> Option<EventPlan> {
        let key = BatchKey::of(events);
        let mut pending = self.pending.lock();
        let pos = pending.iter().rposition(|(pending_key, _)| *pending_key == key)?;
        Some(pending.remove(pos).1)
    }

    pub(crate) fn after(self: &Arc<Self>, events: &[FileEvent]) {
        let mut plan = match self.take_pending(events) {
            Some(plan) => plan,
            None => {
                log::error!("after() without matching before() for {} events", events.len());
                EventPlan {
                    version: u64::MAX,
                    ..Default::default()
                }
            }
        };
        let mut fired: FnvHashSet<PointerId> = plan.pointers.iter().copied().collect();

        let to_fire = loop {
            let mut state = self.state.lock();
            if plan.version != state.version {
                log::debug!("pointers changed during event batch; recollecting");
                let fresh = EventPlan::collect(&state, events);
                let already: FnvHashSet<PointerId> = fired
                    .iter()
                    .filter_map(|&id| state.pointers.resolve(id))
                    .collect();
                let late: Vec<PointerId> = fresh
                    .pointers
                    .iter()
                    .copied()
                    .filter(|id| !already.contains(id))
                    .collect();
                plan.version = fresh.version;
                plan.to_update = fresh.to_update;
                plan.pointers.extend(late.iter().copied());
                if !late.is_empty() {
                    let late_notifications = notifications(&state, self, &late);
                    drop(state);
                    fired.extend(late);
                    fire_before(&late_notifications);
                    continue;
                }
            }

            let mut changed = false;
            for &(family, node) in &plan.to_update {
                changed |= state.update(family, node);
            }
            if changed {
                state.version += 1;
            }
            if !plan.is_empty() {
                self.modification_count.fetch_add(1, Ordering::SeqCst);
            }
            if self.config.check_consistency_after_batch {
                if let Err(err) = state.check_consistency(&CancellationToken::noop()) {
                    log::error!("after event batch: {err}");
                }
            }
            break notifications(&state, self, &plan.pointers);
        };

        for notification in &to_fire {
            notification.listener.validity_changed(&notification.pointers);
        }
    }
}

fn fire_before(to_fire: &[Notification]) {
    for notification in to_fire {
        notification
            .listener
            .before_validity_changed(&notification.pointers);
    }
}

impl BulkFileListener for PointerRegistry {
    fn before(&self, events: &[FileEvent]) {
        self.shared.before(events);
    }

    fn after(&self, events: &[FileEvent]) {
        self.shared.after(events);
    }
}

impl PointerRegistry {
    /// The registry as a namespace event listener.
    pub fn event_listener(&self) -> Arc<dyn BulkFileListener> {
        Arc::new(self.clone())
    }

    /// Runs `apply` between the before and after phases of `events`.
    pub fn process_batch<R>(&self, events: &[FileEvent], apply: impl FnOnce() -> R) -> R {
        self.shared.before(events);
        let result = apply();
        self.shared.after(events);
        result
    }
}
