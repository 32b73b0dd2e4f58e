//! Hover-triggered prefetch.
//!
//! A hover schedules a read of the item after a short delay. Leaving before
//! the delay elapses cancels it, and each item is prefetched at most once per
//! session.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::reader::Reader;

/// Scheduled and finished prefetches, guarded together so an item moves from
/// one to the other atomically.
#[derive(Debug, Default)]
struct Slots {
    pending: HashMap<String, JoinHandle<()>>,
    done: HashSet<String>,
}

#[derive(Debug)]
pub struct HoverPrefetcher {
    reader: Arc<Reader>,
    delay: Duration,
    slots: Arc<Mutex<Slots>>,
}

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HoverPrefetcher {
    pub fn new(reader: Arc<Reader>, delay: Duration) -> Self {
        Self { reader, delay, slots: Arc::default() }
    }

    /// Pointer entered `locator`. Returns whether a prefetch was scheduled.
    pub fn hover_start(&self, locator: &str) -> bool {
        let mut slots = lock(&self.slots);
        if slots.done.contains(locator) || slots.pending.contains_key(locator) {
            return false;
        }

        let key = locator.to_string();
        let reader = self.reader.clone();
        let delay = self.delay;
        let shared = self.slots.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slots = lock(&shared);
                slots.pending.remove(&key);
                slots.done.insert(key.clone());
            }

            if reader.is_stored(&key).await {
                return;
            }
            match reader.read(&key).await {
                Ok(_) => tracing::debug!(locator = %key, "hover prefetch stored"),
                Err(e) => tracing::debug!(locator = %key, error = %e, "hover prefetch failed"),
            }
        });
        slots.pending.insert(locator.to_string(), handle);
        true
    }

    /// Pointer left `locator`. Returns whether a pending prefetch was cancelled.
    pub fn hover_end(&self, locator: &str) -> bool {
        match lock(&self.slots).pending.remove(locator) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.slots).pending.len()
    }
}

impl Drop for HoverPrefetcher {
    fn drop(&mut self) {
        let pending = std::mem::take(&mut lock(&self.slots).pending);
        for handle in pending.into_values() {
            handle.abort();
        }
    }
}
