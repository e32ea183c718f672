//! Per-key serialization of in-flight fetches.
//!
//! Two requests for the same sidecar (say, the lyrics of one track) must
//! not race: the second waits for the first and then finds its cache
//! write. Requests for different keys run concurrently.

use std::{collections::HashMap, sync::Arc};

use {
    parking_lot::Mutex,
    tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard},
};

type Slots = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Registry of keys with a fetch in progress.
#[derive(Debug, Default, Clone)]
pub struct InFlight {
    slots: Slots,
}

/// Held while a fetch for `key` runs; dropping it lets the next waiter in.
#[derive(Debug)]
pub struct InFlightGuard {
    key: String,
    slots: Slots,
    _lock: OwnedMutexGuard<()>,
}

impl InFlight {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other fetch holds `key`, then holds it.
    pub async fn acquire(&self, key: &str) -> InFlightGuard {
        let slot = self
            .slots
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        InFlightGuard {
            key: key.to_string(),
            slots: self.slots.clone(),
            _lock: slot.lock_owned().await,
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        // The map and this guard hold the only references: nobody is waiting.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) <= 2)
        {
            slots.remove(&self.key);
        }
    }
}
