use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};

/// Per-tree FIFO mutex (spec.md §4.7, §5): at most one `index`/`clear` runs
/// per tree at a time, and concurrent callers for the same tree are served
/// in the order they arrived.
///
/// `tokio::sync::Mutex` already queues waiters FIFO internally, so a map of
/// `normalized_path -> Arc<tokio::sync::Mutex<()>>` gets the ordering
/// guarantee for free; this type only adds the "one lock per path,
/// shared by all callers" bookkeeping (spec.md's "map normalizedPath ->
/// Promise/chan"). Entries are never evicted — one entry per tree ever
/// indexed in this process's lifetime is a bounded, acceptable cost
/// (spec.md §9 "Global state": no teardown requirement).
#[derive(Default)]
pub struct TreeMutexMap {
    locks: StdMutex<HashMap<String, Arc<TokioMutex<()>>>>,
}

impl TreeMutexMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for any in-flight operation on `tree` to finish, then returns
    /// a guard held for the duration of this caller's operation. The
    /// mutex is not held across suspension points beyond the caller's own
    /// critical section — it's released when the guard drops at the end
    /// of the handler function (spec.md §5 "Suspension points").
    pub async fn acquire(&self, tree: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks.entry(tree.to_string()).or_insert_with(|| Arc::new(TokioMutex::new(()))).clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_operations_on_same_tree_serialize() {
        let mutex_map = Arc::new(TreeMutexMap::new());
        let order = Arc::new(StdMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let mutex_map = mutex_map.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _guard = mutex_map.acquire("/tree").await;
                tokio::time::sleep(Duration::from_millis(5)).await;
                order.lock().unwrap().push(i);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(order.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn different_trees_do_not_block_each_other() {
        let mutex_map = Arc::new(TreeMutexMap::new());
        let counter = Arc::new(AtomicU32::new(0));

        let g1 = mutex_map.acquire("/a").await;
        let mutex_map2 = mutex_map.clone();
        let counter2 = counter.clone();
        let handle = tokio::spawn(async move {
            let _g = mutex_map2.acquire("/b").await;
            counter2.fetch_add(1, Ordering::SeqCst);
        });
        handle.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        drop(g1);
    }
}
