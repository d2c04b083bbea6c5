//! Single-shot broadcast cell.
//!
//! One producer publishes a value exactly once; any number of readers either see it immediately
//! through a lock-free load or block until it is published. There is no timeout and no
//! cancellation: a published value lives as long as the cell.

use std::sync::{Condvar, Mutex, OnceLock, PoisonError};

pub struct OnceBroadcast<T> {
    value: OnceLock<T>,
    lock: Mutex<()>,
    ready: Condvar,
}

impl<T> Default for OnceBroadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OnceBroadcast<T> {
    pub const fn new() -> Self {
        Self {
            value: OnceLock::new(),
            lock: Mutex::new(()),
            ready: Condvar::new(),
        }
    }

    /// Store `value` and wake every waiter.
    ///
    /// First writer wins. Returns `false` (dropping `value`) if something was already published.
    pub fn publish(&self, value: T) -> bool {
        let stored = self.value.set(value).is_ok();
        // Notify under the lock so a reader between its re-check and its wait cannot miss it.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.ready.notify_all();
        stored
    }

    /// Published value, if any. Never blocks.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_published(&self) -> bool {
        self.value.get().is_some()
    }

    /// Block until a value is published and return it.
    pub fn wait(&self) -> &T {
        if let Some(value) = self.value.get() {
            return value;
        }
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(value) = self.value.get() {
                return value;
            }
            guard = self
                .ready
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
