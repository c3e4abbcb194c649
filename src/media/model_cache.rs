// SPDX-License-Identifier: MPL-2.0
//! Process-wide lazy cache for an expensive model handle.
//!
//! The cache guarantees at most one live handle per cache for the process
//! lifetime: concurrent first-time acquisitions race on a build lock, the
//! loser re-checks the slot, and every caller observes either an empty slot
//! or a fully constructed handle. Construction failures leave the slot empty,
//! so a later acquisition attempts construction again; only successes are
//! cached.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Lazily-initialized, thread-safe slot for a shared model handle.
///
/// # Concurrency
///
/// `cached` is a read-locked fast path with no exclusive locking. The build
/// lock is held only while constructing; it blocks at most the callers that
/// lose the first-construction race. Lock poisoning is recovered via
/// `PoisonError::into_inner`: the slot only ever holds fully constructed
/// handles, so its state is consistent even if a builder panicked.
#[derive(Debug)]
pub struct ModelCache<H> {
    slot: RwLock<Option<Arc<H>>>,
    build_lock: Mutex<()>,
}

impl<H> Default for ModelCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ModelCache<H> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Returns the cached handle if one has been constructed.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<H>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    /// Returns `true` if a handle is currently cached.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cached().is_some()
    }

    /// Returns the cached handle, constructing it with `build` if absent.
    ///
    /// Double-checked: the fast path re-reads under the build lock so that
    /// concurrent first calls construct exactly once and all callers receive
    /// the same handle identity.
    ///
    /// # Errors
    ///
    /// Propagates the builder's error. The slot stays empty on failure; a
    /// subsequent call attempts construction again.
    pub fn acquire_with<E, F>(&self, build: F) -> Result<Arc<H>, E>
    where
        F: FnOnce() -> Result<H, E>,
    {
        if let Some(handle) = self.cached() {
            return Ok(handle);
        }

        let _build = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = self.cached() {
            return Ok(handle);
        }

        let handle = Arc::new(build()?);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&handle));
        Ok(handle)
    }
}
