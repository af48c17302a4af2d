//! Generic bounded key→value cache with per-entry TTL, LRU eviction, and
//! single-flight compute (C1).
//!
//! Used on hot lookup paths — the matcher's embedding cache and, outside
//! this crate's scope, an authentication layer validating positive and
//! negative results under the same eviction-callback contract.

mod lru;
mod stats;

pub use stats::CacheStats;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use lru::LruStore;

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    Expired,
    Capacity,
    Manual,
}

type EvictionCallback<K, V> = Box<dyn Fn(&K, &V, EvictionReason) + Send + Sync>;

struct Inner<K, V> {
    store: parking_lot::Mutex<LruStore<K, V>>,
    in_flight: DashMap<K, Arc<OnceCell<V>>>,
    stats: stats::Counters,
    on_evict: Option<EvictionCallback<K, V>>,
}

/// A bounded cache with LRU eviction and per-entry TTL.
pub struct Cache<K, V>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Inner<K, V>>,
    sweeper: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> Cache<K, V>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_eviction_callback(capacity, None)
    }

    #[must_use]
    pub fn with_eviction_callback(capacity: usize, on_evict: Option<EvictionCallback<K, V>>) -> Self {
        let inner = Arc::new(Inner {
            store: parking_lot::Mutex::new(LruStore::new(capacity)),
            in_flight: DashMap::new(),
            stats: stats::Counters::default(),
            on_evict,
        });
        Self { inner, sweeper: parking_lot::Mutex::new(None) }
    }

    /// Start a background sweeper that prunes expired entries on a fixed
    /// cadence. Holds only a weak reference to the cache's state, so a
    /// dropped `Cache` lets the sweeper exit on its next tick rather than
    /// keeping the process alive.
    pub fn start_sweeper(&self, period: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { return };
                Self::prune_inner(&inner);
            }
        });
        *self.sweeper.lock() = Some(handle);
    }

    /// Stop the sweeper task. Idempotent.
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }

    /// `Get`: returns a hit only if present and unexpired, promoting it to
    /// most-recently-used. An expired hit is removed and reported as a miss.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let mut store = self.inner.store.lock();
        match store.get_promote(key) {
            lru::GetResult::Hit(v) => {
                self.inner.stats.record_hit();
                Some(v)
            }
            lru::GetResult::Expired(v) => {
                self.inner.stats.record_miss();
                self.inner.stats.record_eviction();
                drop(store);
                self.fire_evict(key, &v, EvictionReason::Expired);
                None
            }
            lru::GetResult::Miss => {
                self.inner.stats.record_miss();
                None
            }
        }
    }

    #[must_use]
    pub fn has(&self, key: &K) -> bool {
        self.inner.store.lock().contains_live(key)
    }

    /// `Set`: insert or overwrite. `ttl = None` means no expiry. Evicts the
    /// least-recently-used entry first if at capacity and this is a new key.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) {
        let evicted = self.inner.store.lock().insert(key, value, ttl);
        if let Some((k, v)) = evicted {
            self.inner.stats.record_eviction();
            self.fire_evict(&k, &v, EvictionReason::Capacity);
        }
    }

    /// `Delete`: manual removal, fires the eviction callback with
    /// `Manual` if the key was present.
    pub fn delete(&self, key: &K) -> bool {
        if let Some(v) = self.inner.store.lock().remove(key) {
            self.fire_evict(key, &v, EvictionReason::Manual);
            true
        } else {
            false
        }
    }

    pub fn clear(&self) {
        let removed = self.inner.store.lock().drain();
        for (k, v) in removed {
            self.fire_evict(&k, &v, EvictionReason::Manual);
        }
    }

    /// `Prune`: remove all currently-expired entries.
    pub fn prune(&self) -> usize {
        Self::prune_inner(&self.inner)
    }

    fn prune_inner(inner: &Arc<Inner<K, V>>) -> usize {
        let expired = inner.store.lock().drain_expired();
        let n = expired.len();
        for (k, v) in &expired {
            inner.stats.record_eviction();
            if let Some(cb) = &inner.on_evict {
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    cb(k, v, EvictionReason::Expired);
                }));
            }
        }
        n
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.inner.store.lock().len())
    }

    fn fire_evict(&self, key: &K, value: &V, reason: EvictionReason) {
        if let Some(cb) = &self.inner.on_evict {
            // A failing callback must not corrupt the cache: isolate it.
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(key, value, reason)));
        }
    }

    /// `GetOrCompute`: at-most-one concurrent computation per key. Concurrent
    /// callers either observe the already-completed value or await the same
    /// in-flight computation (backed by [`tokio::sync::OnceCell`]).
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F, ttl: Option<Duration>) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let cell = self
            .inner
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell.get_or_try_init(compute).await;

        // Whoever observes completion first retires the in-flight slot and
        // promotes the value into the main store; later retirers are no-ops
        // because `remove_if` only matches the exact Arc we raced against.
        self.inner
            .in_flight
            .remove_if(&key, |_, v| Arc::ptr_eq(v, &cell));

        match result {
            Ok(value) => {
                self.set(key, value.clone(), ttl);
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn lru_eviction_after_access_pattern() {
        // Scenario from spec §8.5: capacity 3; insert A,B,C,D (D displaces
        // A); access B; insert E; evicted key is C, not D.
        let cache: Cache<&'static str, i32> = Cache::new(3);
        cache.set("A", 1, None);
        cache.set("B", 2, None);
        cache.set("C", 3, None);
        cache.set("D", 4, None); // displaces A

        assert!(!cache.has(&"A"));
        assert!(cache.has(&"B"));
        assert!(cache.has(&"C"));
        assert!(cache.has(&"D"));

        assert_eq!(cache.get(&"B"), Some(2)); // promote B to MRU

        cache.set("E", 5, None); // should displace C (LRU after promotion), not D

        assert!(!cache.has(&"C"), "C should have been evicted, not D");
        assert!(cache.has(&"D"));
        assert!(cache.has(&"B"));
        assert!(cache.has(&"E"));
    }

    #[test]
    fn capacity_eviction_fires_callback_with_capacity_reason() {
        let seen: Arc<parking_lot::Mutex<Vec<EvictionReason>>> = Arc::new(parking_lot::Mutex::new(vec![]));
        let seen_clone = seen.clone();
        let cache: Cache<i32, i32> = Cache::with_eviction_callback(
            2,
            Some(Box::new(move |_k: &i32, _v: &i32, reason| {
                seen_clone.lock().push(reason);
            })),
        );
        cache.set(1, 1, None);
        cache.set(2, 2, None);
        cache.set(3, 3, None); // evicts key 1

        assert_eq!(seen.lock().as_slice(), &[EvictionReason::Capacity]);
    }

    #[test]
    fn expired_get_reports_miss_and_removes_entry() {
        let cache: Cache<&'static str, i32> = Cache::new(10);
        cache.set("k", 1, Some(Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"k"), None);
        assert!(!cache.has(&"k"));
    }

    #[test]
    fn hit_rate_tracks_hits_and_misses() {
        let cache: Cache<&'static str, i32> = Cache::new(10);
        cache.set("k", 1, None);
        cache.get(&"k"); // hit
        cache.get(&"missing"); // miss
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[tokio::test]
    async fn get_or_compute_is_single_flight() {
        let cache: Arc<Cache<&'static str, i32>> = Arc::new(Cache::new(10));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute::<_, _, std::convert::Infallible>(
                        "k",
                        || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(42)
                        },
                        None,
                    )
                    .await
            }));
        }

        let mut results = vec![];
        for h in handles {
            results.push(h.await.unwrap().unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1, "compute must run exactly once");
        assert!(results.iter().all(|v| *v == 42));
    }

    #[tokio::test]
    async fn sweeper_prunes_without_blocking_shutdown() {
        let cache: Cache<&'static str, i32> = Cache::new(10);
        cache.set("k", 1, Some(Duration::from_millis(0)));
        cache.start_sweeper(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!cache.has(&"k"));
        cache.shutdown();
    }
}
