//! Session-keyed async mutex map enforcing per-session serialization:
//! within a single session id, message processing is serialized
//! end-to-end, while different sessions proceed in parallel. Uses the
//! same lazily-populated `dashmap` pattern as the Agent Registry and
//! Assignment Cache, rather than a single global lock.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `session_id`, creating it on first use. Holding
    /// the returned guard serializes every other call for the same session;
    /// calls for a different session never block on this one.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_session_calls_serialize() {
        let locks = Arc::new(SessionLocks::new());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let locks_a = locks.clone();
        let order_a = order.clone();
        let task_a = tokio::spawn(async move {
            let _guard = locks_a.lock("s-1").await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            order_a.lock().unwrap().push(1);
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        let locks_b = locks.clone();
        let order_b = order.clone();
        let task_b = tokio::spawn(async move {
            let _guard = locks_b.lock("s-1").await;
            order_b.lock().unwrap().push(2);
        });

        let _ = tokio::join!(task_a, task_b);
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn different_sessions_do_not_block_each_other() {
        let locks = Arc::new(SessionLocks::new());
        let counter = Arc::new(AtomicU32::new(0));

        let guard_a = locks.lock("s-1").await;
        let locks_b = locks.clone();
        let counter_b = counter.clone();
        let task_b = tokio::spawn(async move {
            let _guard = locks_b.lock("s-2").await;
            counter_b.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::timeout(Duration::from_millis(200), task_b)
            .await
            .expect("s-2 lock acquired without waiting on s-1")
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        drop(guard_a);
    }
}
