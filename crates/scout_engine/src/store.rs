use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use scout_core::{update, Effect, Msg, ResultsPage, StateSnapshot, StoreState};

/// Lock-guarded home of [`StoreState`].
///
/// Every write goes through [`SharedStateStore::apply`], every read copies out
/// under the same lock, so readers never see a half-applied message.
#[derive(Debug, Default)]
pub struct SharedStateStore {
    inner: Mutex<StoreState>,
}

impl SharedStateStore {
    pub fn new(state: StoreState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Applies a message and returns the effects for the caller to run
    /// after the lock is released.
    pub fn apply(&self, msg: Msg) -> Vec<Effect> {
        let mut guard = self.lock();
        let state = std::mem::take(&mut *guard);
        let (state, effects) = update(state, msg);
        *guard = state;
        effects
    }

    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.lock())
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.lock().view(Utc::now())
    }

    pub fn results_page(&self, limit: usize) -> ResultsPage {
        self.lock().results_page(limit)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // The reducer is pure; a poisoned lock still holds a whole state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
