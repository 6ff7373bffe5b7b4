//! Cancellation tokens for long-running trie walks.
//!
//! Consistency walks over a large trie can take a while; interactive callers
//! hand in a token and bump the tracker to abandon a walk early.
//!
//! ## Sparse Checking
//!
//! `is_cancelled_sparse()` only reads the atomic every 4,096 nodes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// How often node walks check whether they were cancelled.
/// Using a power of 2 allows efficient modulo via bitwise AND.
pub const CANCEL_CHECK_INTERVAL: usize = 0x1000;

/// Tracks the active walk version for cancellation.
///
/// Starting a new walk with `next_version()` cancels every token handed out
/// for an older version.
#[derive(Debug, Default, Clone)]
pub struct WalkVersionTracker {
    active_version: Arc<AtomicU64>,
}

impl WalkVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the active version and returns the new version number.
    pub fn next_version(&self) -> u64 {
        self.active_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the current active version without incrementing.
    pub fn current_version(&self) -> u64 {
        self.active_version.load(Ordering::SeqCst)
    }

    /// Creates a token that stays live until the tracker moves past `version`.
    pub fn token_for_version(&self, version: u64) -> CancellationToken {
        CancellationToken {
            active_version: Some(self.active_version.clone()),
            version,
        }
    }
}

/// A cancellation token for terminating long-running walks.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    /// Atomic holding the active version; `None` for tokens that never cancel.
    active_version: Option<Arc<AtomicU64>>,
    version: u64,
}

impl CancellationToken {
    /// Creates a cancellation token that is never cancelled.
    #[inline]
    pub fn noop() -> Self {
        Self::default()
    }

    /// Returns `Some(())` while still active, `None` once cancelled.
    ///
    /// The `Option` shape allows early returns with `?`.
    #[inline]
    pub fn is_cancelled(&self) -> Option<()> {
        match &self.active_version {
            Some(active) if active.load(Ordering::Relaxed) != self.version => None,
            _ => Some(()),
        }
    }

    /// Sparse cancellation check - only reads the atomic every `CANCEL_CHECK_INTERVAL` calls.
    #[inline]
    pub fn is_cancelled_sparse(&self, counter: usize) -> Option<()> {
        if counter & (CANCEL_CHECK_INTERVAL - 1) == 0 {
            self.is_cancelled()
        } else {
            Some(())
        }
    }
}
