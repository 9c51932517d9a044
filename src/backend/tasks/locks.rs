//! Per-(bot space, bot) serialization
//!
//! Transitions into `in_progress` read the bot's active task and then write.
//! Holding the bot's lock across both steps makes the pair atomic within this
//! process; the store's uniqueness rule covers other processes.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Async mutexes keyed by `(bot_space_id, bot_id)`
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<(Uuid, Uuid), Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock for one bot
    pub async fn lock(&self, bot_space_id: Uuid, bot_id: Uuid) -> OwnedMutexGuard<()> {
        // Clone out of the map so no shard lock is held across the await
        let mutex = self.locks.entry((bot_space_id, bot_id)).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drop locks nobody holds or waits on
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
