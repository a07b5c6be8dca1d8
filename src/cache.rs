//! `QuoteCache`: a process-wide keyed cache with TTL and single-flight
//! coalescing (spec §4.3). One structure backs every cached operation
//! (reference roster, snapshots, fundamentals, history) — callers key by
//! `(operation, arguments)` and get back a strongly-typed value via
//! downcast, so the eviction/TTL/single-flight policy lives in one place
//! instead of being duplicated per operation, the way the teacher keeps one
//! `CachedStore` behind every data-layer call (`data/cache.rs`).

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Notify;

type AnyValue = Arc<dyn Any + Send + Sync>;

enum Slot {
    /// Another caller is already loading this key; waiters subscribe to the
    /// `Notify` and re-check the map once woken.
    Loading(Arc<Notify>),
    Ready { value: AnyValue, inserted_at: Instant },
}

pub struct QuoteCache {
    entries: DashMap<String, Slot>,
    /// Access order is kept outside the dashmap so eviction doesn't need to
    /// hold the shard lock for the whole scan.
    last_access: Mutex<HashMap<String, Instant>>,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

impl QuoteCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            last_access: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    fn touch(&self, key: &str) {
        self.last_access
            .lock()
            .unwrap()
            .insert(key.to_string(), Instant::now());
    }

    fn evict_if_over_capacity(&self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let victim = {
            let access = self.last_access.lock().unwrap();
            access
                .iter()
                .min_by_key(|(_, t)| **t)
                .map(|(k, _)| k.clone())
        };
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.last_access.lock().unwrap().remove(&key);
        }
    }

    /// `Get(key, ttl, loader)` from spec §4.3: return a fresh cached value,
    /// join an in-flight load for the same key, or invoke `loader` and
    /// publish its result. A loader failure is never cached — the next
    /// caller retries from scratch.
    pub async fn get_or_load<V, F, Fut, E>(
        &self,
        key: impl Into<String>,
        ttl: Duration,
        loader: F,
    ) -> Result<Arc<V>, E>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
    {
        let key = key.into();
        loop {
            // Fast path: fresh entry already present.
            if let Some(entry) = self.entries.get(&key) {
                match &*entry {
                    Slot::Ready { value, inserted_at } if inserted_at.elapsed() < ttl => {
                        let value = value.clone();
                        drop(entry);
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        self.touch(&key);
                        return Ok(value.downcast::<V>().expect("cache type mismatch for key"));
                    }
                    Slot::Loading(notify) => {
                        let notify = notify.clone();
                        drop(entry);
                        notify.notified().await;
                        continue;
                    }
                    Slot::Ready { .. } => {
                        // Expired; fall through to claim the load below.
                        drop(entry);
                    }
                }
            }

            // Claim the load slot for this key, or join whoever just claimed it.
            let notify = Arc::new(Notify::new());
            let mut claimed = false;
            self.entries
                .entry(key.clone())
                .and_modify(|slot| {
                    if let Slot::Ready { inserted_at, .. } = slot {
                        if inserted_at.elapsed() >= ttl {
                            *slot = Slot::Loading(notify.clone());
                            claimed = true;
                        }
                    }
                })
                .or_insert_with(|| {
                    claimed = true;
                    Slot::Loading(notify.clone())
                });

            if !claimed {
                // Someone else's fresh value landed between our fast-path
                // check and this claim attempt; loop back to read it.
                continue;
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            match loader().await {
                Ok(value) => {
                    let boxed: AnyValue = Arc::new(value);
                    self.entries.insert(
                        key.clone(),
                        Slot::Ready {
                            value: boxed.clone(),
                            inserted_at: Instant::now(),
                        },
                    );
                    self.touch(&key);
                    self.evict_if_over_capacity();
                    notify.notify_waiters();
                    return Ok(boxed.downcast::<V>().expect("cache type mismatch for key"));
                }
                Err(e) => {
                    self.entries.remove(&key);
                    notify.notify_waiters();
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn second_call_within_ttl_does_not_invoke_loader() {
        let cache = QuoteCache::new(100);
        let calls = Arc::new(AtomicU32::new(0));
        for _ in 0..2 {
            let calls = calls.clone();
            cache
                .get_or_load::<u32, _, _, ()>("k", Duration::from_secs(60), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_reload() {
        let cache = QuoteCache::new(100);
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        cache
            .get_or_load::<u32, _, _, ()>("k", Duration::from_millis(10), || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let calls3 = calls.clone();
        cache
            .get_or_load::<u32, _, _, ()>("k", Duration::from_millis(10), || async move {
                calls3.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn loader_failure_is_not_cached() {
        let cache = QuoteCache::new(100);
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let first: Result<Arc<u32>, &'static str> = cache
            .get_or_load("k", Duration::from_secs(60), || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Err("boom")
            })
            .await;
        assert!(first.is_err());
        let calls3 = calls.clone();
        let second: Result<Arc<u32>, &'static str> = cache
            .get_or_load("k", Duration::from_secs(60), || async move {
                calls3.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn single_flight_collapses_concurrent_misses() {
        let cache = Arc::new(QuoteCache::new(100));
        let calls = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_load::<u32, _, _, ()>("shared", Duration::from_secs(60), || async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(9)
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(*h.await.unwrap(), 9);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn eviction_respects_capacity() {
        let cache = QuoteCache::new(2);
        for i in 0..5u32 {
            cache
                .get_or_load::<u32, _, _, ()>(format!("k{i}"), Duration::from_secs(60), || async move {
                    Ok(i)
                })
                .await
                .unwrap();
        }
        assert!(cache.stats().entries <= 2);
    }
}
