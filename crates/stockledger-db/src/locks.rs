//! # Per-Item Locks
//!
//! Serializes check-then-act sequences on the same item.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  task A: outbound 6 on drill     task B: outbound 6 on drill           │
//! │       │                               │                                 │
//! │  locks.lock("drill") ✓           locks.lock("drill") … waits           │
//! │  begin / balance=10 / insert                                           │
//! │  commit, guard dropped ─────────────► acquired                         │
//! │                                  begin / balance=4 / rejected           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locks are always taken before a pooled connection is acquired, and
//! multiple ids are locked in sorted order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held lock on one item id.
pub type ItemGuard = OwnedMutexGuard<()>;

/// Registry of async mutexes keyed by item id.
#[derive(Debug, Clone, Default)]
pub struct ItemLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, item_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        // Drop entries nobody holds or waits on.
        map.retain(|_, m| Arc::strong_count(m) > 1);

        map.entry(item_id.to_string()).or_default().clone()
    }

    /// Waits for exclusive access to `item_id`.
    pub async fn lock(&self, item_id: &str) -> ItemGuard {
        self.handle(item_id).lock_owned().await
    }

    /// Locks several ids (duplicates collapsed) in sorted order.
    pub async fn lock_all(&self, item_ids: &[&str]) -> Vec<ItemGuard> {
        let mut ids = item_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock(id).await);
        }
        guards
    }

    /// Number of ids currently tracked.
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_id_is_exclusive() {
        let locks = ItemLocks::new();
        let guard = locks.lock("a").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move { contender.lock("a").await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        let _second = waiting.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let locks = ItemLocks::new();
        let _a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_lock_all_dedups() {
        let locks = ItemLocks::new();
        let guards = locks.lock_all(&["b", "a", "b"]).await;
        assert_eq!(guards.len(), 2);
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = ItemLocks::new();
        for id in ["a", "b", "c"] {
            let _g = locks.lock(id).await;
        }
        let _held = locks.lock("d").await;
        assert_eq!(locks.tracked(), 1);
    }
}
