//! In-flight call deduplication.
//!
//! Concurrent callers asking for the same key share one computation: the
//! first registers a cell and runs the initializer, the rest await the cell.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;
use tracing::warn;

type Calls<V> = HashMap<String, Arc<OnceCell<V>>>;

pub(crate) struct Singleflight<V> {
    calls: Mutex<Calls<V>>,
}

impl<V: Clone> Singleflight<V> {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `init` unless a call for `key` is already in flight, in which
    /// case its result is shared.
    ///
    /// A failed `init` leaves nothing behind; a waiting caller then runs its
    /// own initializer.
    pub(crate) async fn run<F, Fut, E>(&self, key: &str, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = self
            .lock("run.register")
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell.get_or_try_init(init).await.cloned();

        let mut calls = self.lock("run.release");
        if calls
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, &cell))
        {
            calls.remove(key);
        }

        result
    }

    /// Number of keys with a call in flight.
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.lock("in_flight").len()
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, Calls<V>> {
        self.calls.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!(
                op,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned singleflight lock"
            );
            poisoned.into_inner()
        })
    }
}
