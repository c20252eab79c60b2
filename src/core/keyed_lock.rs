use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per string key. Locks are created on first use and
/// kept for the lifetime of the registry; the key space mirrors caches that are
/// already bounded, so the registry is never trimmed.
#[derive(Default)]
pub struct KeyedLock {
  locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLock {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every call with the same key returns a handle to the same lock.
  pub fn acquire(&self, key: &str) -> Arc<AsyncMutex<()>> {
    let mut locks = self.locks.lock();
    if let Some(lock) = locks.get(key) {
      return Arc::clone(lock);
    }
    let lock = Arc::new(AsyncMutex::new(()));
    locks.insert(key.to_string(), Arc::clone(&lock));
    lock
  }

  pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
    self.acquire(key).lock_owned().await
  }

  pub fn len(&self) -> usize {
    self.locks.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn test_same_key_same_lock() {
    let locks = KeyedLock::new();
    let a = locks.acquire("album:7");
    let b = locks.acquire("album:7");
    let c = locks.acquire("album:8");
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(locks.len(), 2);
  }

  #[tokio::test]
  async fn test_lock_excludes_same_key_only() {
    let locks = Arc::new(KeyedLock::new());
    let guard = locks.lock("k").await;

    let other = locks.acquire("other");
    assert!(other.try_lock().is_ok());

    let same = locks.acquire("k");
    assert!(same.try_lock().is_err());

    let waiter = {
      let locks = Arc::clone(&locks);
      tokio::spawn(async move {
        let _guard = locks.lock("k").await;
      })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());
    drop(guard);
    waiter.await.unwrap();
  }
}
