//! The pointer registry.
//!
//! A `PointerRegistry` is the single entry point for creating pointers and
//! the consumer of namespace event batches. Everything mutable sits behind
//! one coarse lock; listener callbacks always run with the lock released.

mod events;
mod listeners;
mod plan;
mod state;

#[cfg(test)]
mod properties;
#[cfg(test)]
mod scenarios;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::config::RegistryConfig;
use crate::error::{PointerError, Result};
use crate::pointer::{
    FilePointer, ListenerId, PointerGroup, PointerId, PointerListener, PointerScope, PointerTarget,
};
use crate::vfs::{Namespace, TrieFamily};

use events::BatchKey;
use plan::EventPlan;
use state::State;

pub(crate) struct Shared {
    pub(crate) config: RegistryConfig,
    pub(crate) state: Mutex<State>,
    modification_count: AtomicU64,
    /// Plans between `before` and `after`, most recent batch last.
    pending: Mutex<Vec<(BatchKey, EventPlan)>>,
}

impl Shared {
    /// Drops references in one locked pass, reporting the first failure.
    pub(crate) fn release(&self, batch: &[(PointerId, u32)]) -> Result<()> {
        let mut state = self.state.lock();
        let mut first_error = None;
        for &(id, count) in batch {
            if let Err(err) = state.release(id, count) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn bump_modification_count(&self) {
        self.modification_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Snapshot of one live pointer for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointerInfo {
    pub id: PointerId,
    pub url: String,
    pub valid: bool,
    pub recursive: bool,
    pub refcount: u32,
    pub listener: Option<ListenerId>,
    /// `None` for identity pointers.
    pub family: Option<TrieFamily>,
}

/// Keeps a subscriber registered until dropped.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    shared: Weak<Shared>,
    id: ListenerId,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.state.lock().listeners.unsubscribe(self.id);
        }
    }
}

/// Creates, deduplicates and tracks file pointers.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct PointerRegistry {
    shared: Arc<Shared>,
}

impl PointerRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let state = State::new(config.linear_scan_threshold);
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                modification_count: AtomicU64::new(0),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    /// Makes pointers into `namespace` trie-backed.
    ///
    /// Existing unresolved nodes are resolved against it right away.
    pub fn register_namespace(&self, namespace: Arc<dyn Namespace>) -> Result<()> {
        let protocol = namespace.protocol().to_string();
        let kind = namespace.kind();
        let mut state = self.shared.state.lock();
        let replaced = state.namespaces.register(namespace)?;
        if replaced.is_some() {
            log::info!("replacing namespace {protocol}");
            state.demote(&protocol);
        }
        let resolved = state.resolve_all();
        drop(state);
        log::info!("registered {kind:?} namespace {protocol}");
        if resolved > 0 || replaced.is_some() {
            self.shared.bump_modification_count();
        }
        Ok(())
    }

    /// A new, empty scope for pointers of this registry.
    pub fn scope(&self) -> PointerScope {
        PointerScope::new(self.shared.clone())
    }

    /// Returns the pointer for (`target`, `listener`), adding a reference.
    ///
    /// The reference belongs to `scope` when given; otherwise the caller
    /// releases it with `FilePointer::dispose`. Targets in namespaces
    /// without trie support get identity pointers that never change.
    pub fn create_pointer(
        &self,
        target: impl Into<PointerTarget>,
        scope: Option<&PointerScope>,
        listener: Option<ListenerId>,
        recursive: bool,
    ) -> Result<FilePointer> {
        self.check_scope(scope)?;
        let target = target.into();
        let id = self
            .shared
            .state
            .lock()
            .create(&target, listener, recursive, self.shared.config.strict)?;
        if let Some(scope) = scope {
            scope.track(id);
        }
        Ok(FilePointer::new(id, listener, self.shared.clone()))
    }

    /// Adds a reference for `listener` at the location of `pointer`.
    pub fn duplicate_pointer(
        &self,
        pointer: &FilePointer,
        scope: Option<&PointerScope>,
        listener: Option<ListenerId>,
    ) -> Result<FilePointer> {
        self.check_scope(scope)?;
        if !Arc::ptr_eq(pointer.shared(), &self.shared) {
            return self.create_pointer(pointer.try_url()?, scope, listener, pointer.is_recursive());
        }
        let id = self.shared.state.lock().duplicate(pointer.id(), listener)?;
        if let Some(scope) = scope {
            scope.track(id);
        }
        Ok(FilePointer::new(id, listener, self.shared.clone()))
    }

    fn check_scope(&self, scope: Option<&PointerScope>) -> Result<()> {
        match scope {
            Some(scope) if !scope.belongs_to(&self.shared) => Err(PointerError::Internal(
                "scope belongs to another registry".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn create_pointer_group(&self, listener: Option<ListenerId>) -> PointerGroup {
        PointerGroup::new(self.clone(), listener)
    }

    /// Registers a per-pointer listener; pass the id when creating pointers.
    pub fn register_listener(&self, listener: Arc<dyn PointerListener>) -> ListenerId {
        self.shared.state.lock().listeners.register(listener)
    }

    /// Stops callbacks to `id`. Pointers created with it stay alive.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.shared.state.lock().listeners.unregister(id)
    }

    /// Subscribes `listener` to every pointer validity change.
    pub fn subscribe(&self, listener: Arc<dyn PointerListener>) -> Subscription {
        let id = self.shared.state.lock().listeners.subscribe(listener);
        Subscription {
            shared: Arc::downgrade(&self.shared),
            id,
        }
    }

    /// Increases on every externally observable validity change.
    pub fn modification_count(&self) -> u64 {
        self.shared.modification_count.load(Ordering::SeqCst)
    }

    /// Resolves every unresolved node whose file now exists.
    pub fn resolve_all(&self) -> usize {
        let resolved = self.shared.state.lock().resolve_all();
        if resolved > 0 {
            self.shared.bump_modification_count();
        }
        resolved
    }

    /// Turns every resolved node of `protocol` back into a url, e.g. before
    /// the namespace is torn down.
    pub fn demote_namespace(&self, protocol: &str) -> usize {
        let demoted = self.shared.state.lock().demote(protocol);
        if demoted > 0 {
            log::info!("demoted {demoted} nodes of {protocol}");
            self.shared.bump_modification_count();
        }
        demoted
    }

    pub fn dump_all_pointers(&self) -> Vec<PointerInfo> {
        let state = self.shared.state.lock();
        let mut infos: Vec<PointerInfo> = state
            .pointers
            .iter()
            .map(|(id, record)| PointerInfo {
                id,
                url: state.pointer_url(id).unwrap_or_default(),
                valid: state.pointer_file(id).flatten().is_some(),
                recursive: record.recursive,
                refcount: record.refcount,
                listener: record.listener,
                family: record.node().map(|(family, _)| family),
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Runs the full consistency walk.
    pub fn assert_consistency(&self) -> Result<()> {
        self.check_consistency(&CancellationToken::noop()).map(|_| ())
    }

    /// Consistency walk that stops early once `token` is cancelled;
    /// `Ok(false)` means it did not finish.
    pub fn check_consistency(&self, token: &CancellationToken) -> Result<bool> {
        self.shared.state.lock().check_consistency(token)
    }

    pub fn pointer_count(&self) -> usize {
        self.shared.state.lock().pointers.len()
    }

    /// Trie nodes across both tries.
    pub fn node_count(&self) -> usize {
        self.shared.state.lock().node_count()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.state.lock().listeners.len()
    }
}

impl Default for PointerRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl std::fmt::Debug for PointerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerRegistry")
            .field("config", &self.shared.config)
            .field("modification_count", &self.modification_count())
            .finish()
    }
}
