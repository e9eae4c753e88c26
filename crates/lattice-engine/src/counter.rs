//! Bounded atomic counters.
//!
//! A bounded counter admits increments only while its current value is below
//! a threshold, atomically at the store. The check-and-add is one store-side
//! operation ([`KvStore::increment_if_below`]), never a client-side
//! read-then-write: under concurrent callers that is the only way the
//! threshold holds.

use std::sync::Arc;

use lattice_schema::keys;
use lattice_store::KvStore;

use crate::error::{EngineError, EngineResult};

/// A handle to one named bounded counter.
///
/// Obtained from [`Engine::counter`](crate::Engine::counter); cheap to clone.
#[derive(Clone)]
pub struct BoundedCounter {
    store: Arc<dyn KvStore>,
    key: String,
}

impl BoundedCounter {
    pub(crate) fn new(store: Arc<dyn KvStore>, name: &str) -> Self {
        Self {
            store,
            key: keys::counter_key(name),
        }
    }

    /// The counter's store key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Atomically increment by `amount` if the current value is below
    /// `threshold`.
    ///
    /// Returns `Ok(Some(new_value))` on success, `Ok(None)` when the counter
    /// has reached the threshold (the value is left unchanged). Threshold
    /// and amount must be positive or the call fails with a validation
    /// error.
    pub fn increment_if_less_than(
        &self,
        threshold: i64,
        amount: i64,
    ) -> EngineResult<Option<i64>> {
        if threshold <= 0 || amount <= 0 {
            return Err(EngineError::InvalidCounterArgs { threshold, amount });
        }
        Ok(self.store.increment_if_below(&self.key, threshold, amount)?)
    }

    /// The current value. Zero if the counter has never been incremented.
    pub fn value(&self) -> EngineResult<i64> {
        Ok(self.store.counter_value(&self.key)?)
    }
}

impl std::fmt::Debug for BoundedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCounter").field("key", &self.key).finish()
    }
}
