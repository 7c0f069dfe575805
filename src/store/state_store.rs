//! State store holding the single authoritative autopilot record.
//!
//! All reads and writes go through a short `RwLock` critical section, so a
//! reader never observes a half-applied merge and concurrent merges are
//! serialized.

use super::types::{AutopilotState, PartialAutopilotState, Snapshot};
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Inner {
    state: AutopilotState,
    version: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl Inner {
    fn commit(&mut self) -> Snapshot {
        self.version += 1;
        self.last_updated = Some(Utc::now());
        Snapshot {
            version: self.version,
            state: self.state,
        }
    }
}

/// Owner of the relayed state.
///
/// Created zero-valued with `Mode::Unset`; shared behind an `Arc` by the
/// ingest and subscriber listeners.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: RwLock<Inner>,
}

impl StateStore {
    /// Creates a store at the default (unset) state.
    pub fn new() -> Self {
        Self::default()
    }

    // Writes are plain field copies; a poisoned lock still holds a whole state.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current state.
    pub fn get(&self) -> AutopilotState {
        self.read().state
    }

    /// Returns the current state with its version.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.read();
        Snapshot {
            version: inner.version,
            state: inner.state,
        }
    }

    /// Overwrites only the fields named in `partial` and returns the result.
    pub fn merge(&self, partial: &PartialAutopilotState) -> Snapshot {
        self.merge_with(partial, |_| ()).0
    }

    /// Like [`merge`](Self::merge), but runs `on_commit` before the write
    /// lock is released, so callers observe commits in version order.
    ///
    /// An update naming no field commits nothing: the version stays put,
    /// `on_commit` is not called and the current snapshot comes back with
    /// `None`.
    pub fn merge_with<R>(
        &self,
        partial: &PartialAutopilotState,
        on_commit: impl FnOnce(&Snapshot) -> R,
    ) -> (Snapshot, Option<R>) {
        let mut inner = self.write();
        if partial.is_empty() {
            let current = Snapshot {
                version: inner.version,
                state: inner.state,
            };
            return (current, None);
        }
        partial.apply_to(&mut inner.state);
        let snapshot = inner.commit();
        let out = on_commit(&snapshot);
        (snapshot, Some(out))
    }

    /// Applies a bootstrapped state only if nothing was committed yet.
    ///
    /// Returns `None` when a producer update (or another bootstrap) got
    /// there first; the candidate is then discarded.
    pub fn apply_bootstrap(&self, candidate: AutopilotState) -> Option<Snapshot> {
        self.apply_bootstrap_with(candidate, |_| ())
    }

    /// Like [`apply_bootstrap`](Self::apply_bootstrap), running `on_commit`
    /// under the write lock when the candidate is applied.
    pub fn apply_bootstrap_with(
        &self,
        candidate: AutopilotState,
        on_commit: impl FnOnce(&Snapshot),
    ) -> Option<Snapshot> {
        let mut inner = self.write();
        if inner.version != 0 {
            return None;
        }
        inner.state = candidate;
        let snapshot = inner.commit();
        on_commit(&snapshot);
        Some(snapshot)
    }

    /// Returns true once a non-empty merge or a bootstrap has been committed.
    pub fn is_initialized(&self) -> bool {
        self.read().version > 0
    }

    /// Time of the last commit, if any.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.read().last_updated
    }
}
