use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = DashMap<Uuid, Arc<Mutex<()>>>;

/// One async mutex per key, so that all writers of a given row are serialised
/// while writers of different rows proceed in parallel.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Arc<LockMap>,
}

/// Held lock on one key. Dropping it releases the key and forgets the mutex
/// once nobody else holds or waits on it.
pub struct KeyedLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
    key: Uuid,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: Uuid) -> KeyedLockGuard {
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        KeyedLockGuard {
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.locks),
            key,
        }
    }

    /// Lock several keys at once. Keys are taken in ascending order, so two
    /// callers locking overlapping sets cannot deadlock. Duplicates are locked once.
    pub async fn acquire_all(&self, keys: &[Uuid]) -> Vec<KeyedLockGuard> {
        let mut keys = keys.to_vec();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        guards
    }

    pub fn tracked_keys(&self) -> usize {
        self.locks.len()
    }
}

impl KeyedLockGuard {
    pub fn key(&self) -> Uuid {
        self.key
    }
}

impl Drop for KeyedLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The map holds one reference; any other holder is a waiter.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let key = Uuid::new_v4();

        let guard = locks.acquire(key).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _first = locks.acquire(Uuid::new_v4()).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Uuid::new_v4())).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn released_keys_are_forgotten() {
        let locks = KeyedLocks::new();
        let held = locks.acquire(Uuid::new_v4()).await;
        drop(locks.acquire(Uuid::new_v4()).await);
        drop(locks.acquire(Uuid::new_v4()).await);
        assert_eq!(locks.tracked_keys(), 1);

        drop(held);
        assert_eq!(locks.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn key_with_waiter_survives_release() {
        let locks = Arc::new(KeyedLocks::new());
        let key = Uuid::new_v4();
        let guard = locks.acquire(key).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire(key).await.key() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        let acquired = tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert_eq!(acquired, key);
        assert_eq!(locks.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn acquire_all_orders_keys_and_skips_duplicates() {
        let locks = Arc::new(KeyedLocks::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let guards = locks.acquire_all(&[b, a, b]).await;
        assert_eq!(guards.len(), 2);
        assert!(guards[0].key() < guards[1].key());

        // Opposite order from another task must not deadlock.
        let other = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire_all(&[a, b]).await.len() })
        };
        drop(guards);
        let taken = tokio::time::timeout(Duration::from_secs(1), other).await.unwrap().unwrap();
        assert_eq!(taken, 2);
    }
}
