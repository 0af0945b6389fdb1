//! TTL Memoization
//!
//! Time-boxed memoization for expensive computations such as a full scan
//! run. Keys are derived from a canonical serialization of the arguments
//! (serde_json orders object keys, so keyword-style arguments hash the same
//! regardless of declaration order).
//!
//! Concurrency contract: callers racing on the same key before the first
//! result lands may each compute once. At-least-once is acceptable here;
//! holding a lock across the computation is not worth the contention.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Generic TTL memo keyed by canonical argument strings
#[derive(Debug)]
pub struct TtlMemo<V: Clone> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlMemo<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Canonical cache key from any serializable argument bundle
    pub fn canonical_key<A: Serialize>(args: &A) -> String {
        serde_json::to_string(args).unwrap_or_else(|_| "<unserializable>".to_string())
    }

    /// Fresh cached value, if any. Expired entries are removed on lookup.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((at, value)) if at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, value: V) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, (Instant::now(), value));
    }

    /// Return the cached value or run `compute` and store its result. The
    /// lock is not held while computing, so concurrent callers with the same
    /// key may both compute; last write wins.
    pub async fn get_or_compute<F, Fut>(&self, key: String, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = compute().await;
        self.put(key, value.clone());
        value
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn second_call_within_ttl_is_cached() {
        let memo: TtlMemo<u32> = TtlMemo::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let got = memo
                .get_or_compute("k".to_string(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    42
                })
                .await;
            assert_eq!(got, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_recomputes() {
        let memo: TtlMemo<u32> = TtlMemo::new(Duration::from_millis(10));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            memo.get_or_compute("k".to_string(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                1
            })
            .await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // Expired entry should have been dropped on the miss
        assert!(memo.get("k").is_none());
    }

    #[test]
    fn canonical_key_is_order_independent_for_maps() {
        use std::collections::BTreeMap;
        let mut a = BTreeMap::new();
        a.insert("workers", 8);
        a.insert("limit", 20);
        let mut b = BTreeMap::new();
        b.insert("limit", 20);
        b.insert("workers", 8);
        assert_eq!(TtlMemo::<u32>::canonical_key(&a), TtlMemo::<u32>::canonical_key(&b));
    }

    #[test]
    fn distinct_args_get_distinct_keys() {
        #[derive(Serialize)]
        struct Args<'a> {
            scanner: &'a str,
            limit: usize,
        }
        let k1 = TtlMemo::<u32>::canonical_key(&Args { scanner: "swing", limit: 20 });
        let k2 = TtlMemo::<u32>::canonical_key(&Args { scanner: "swing", limit: 10 });
        assert_ne!(k1, k2);
    }
}
