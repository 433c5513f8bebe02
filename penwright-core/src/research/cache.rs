//! Research cache: bounded LRU with TTL expiry and single-flight coalescing.
//!
//! Entries expire lazily: a read at or past `created_at + ttl` evicts the
//! entry and reports a miss. Capacity is bounded; the least recently used
//! entry is evicted when full. An optional background sweeper removes
//! expired entries that are never read again.

use super::ResearchSummary;
use lru::LruCache;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Separates the topic from the keyword list inside a key.
const KEY_SEPARATOR: char = '\u{1f}';

/// Cache key: a pure function of the normalized topic and the sorted,
/// normalized, de-duplicated keyword set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(topic: &str, keywords: &[String]) -> Self {
        let mut normalized: Vec<String> = keywords
            .iter()
            .map(|k| normalize(k))
            .filter(|k| !k.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();

        let mut key = normalize(topic);
        key.push(KEY_SEPARATOR);
        key.push_str(&normalized.join(","));
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.replace(KEY_SEPARATOR, " | "))
    }
}

/// NFKC, lowercase, collapsed whitespace.
fn normalize(s: &str) -> String {
    s.nfkc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// One cached research result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub summaries: Vec<ResearchSummary>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries pushed out by the capacity bound.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner {
    entries: LruCache<CacheKey, CacheEntry>,
    stats: CacheStats,
}

type FlightMap = HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>;

/// Process-wide memo of research results.
pub struct ResearchCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    capacity: NonZeroUsize,
    flights: Arc<Mutex<FlightMap>>,
}

impl ResearchCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
            ttl,
            capacity,
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key` now.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<ResearchSummary>> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`; an expired entry is evicted and misses.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Vec<ResearchSummary>> {
        let mut inner = self.lock();
        let expired = match inner.entries.peek(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                inner.stats.misses += 1;
                return None;
            }
        };

        if expired {
            inner.entries.pop(key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            debug!(key = %key, "Research cache entry expired");
            return None;
        }

        let summaries = inner.entries.get(key).map(|e| e.summaries.clone());
        inner.stats.hits += 1;
        summaries
    }

    /// Store `summaries` under `key` now. Empty results are not cached.
    pub fn put(&self, key: CacheKey, summaries: Vec<ResearchSummary>) -> bool {
        self.put_at(key, summaries, Instant::now())
    }

    /// Store `summaries` under `key` as of `now`. Returns whether it was stored.
    pub fn put_at(&self, key: CacheKey, summaries: Vec<ResearchSummary>, now: Instant) -> bool {
        if summaries.is_empty() {
            return false;
        }
        let entry = CacheEntry {
            key: key.clone(),
            summaries,
            created_at: now,
            ttl: self.ttl,
        };
        let mut inner = self.lock();
        if let Some((evicted, _)) = inner.entries.push(key.clone(), entry)
            && evicted != key
        {
            inner.stats.evictions += 1;
            debug!(key = %evicted, "Research cache at capacity, evicted LRU entry");
        }
        true
    }

    /// Remove every expired entry now.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// Remove every entry expired as of `now`; returns how many were removed.
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut inner = self.lock();
        let expired: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.entries.pop(key);
        }
        inner.stats.expirations += expired.len() as u64;
        expired.len()
    }

    /// Periodically sweep expired entries until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.sweep_expired();
                if removed > 0 {
                    debug!(removed, "Swept expired research cache entries");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Wait for exclusive right to compute `key`.
    ///
    /// Concurrent callers for the same key queue behind the first; each should
    /// re-check the cache after acquiring the guard. The guard releases the
    /// key when dropped.
    pub async fn begin_flight(&self, key: &CacheKey) -> FlightGuard {
        let lock = {
            let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
            flights.entry(key.clone()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        FlightGuard {
            key: key.clone(),
            flights: Arc::clone(&self.flights),
            guard: Some(guard),
        }
    }

    /// Number of keys currently being computed or awaited.
    pub fn flights_in_progress(&self) -> usize {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive claim on computing one cache key.
pub struct FlightGuard {
    key: CacheKey,
    flights: Arc<Mutex<FlightMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left (map + this guard) means nobody is waiting.
        if let Some(lock) = flights.get(&self.key)
            && Arc::strong_count(lock) <= 2
        {
            flights.remove(&self.key);
        }
        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::{AuthorityTier, SummaryOrigin};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn summary(title: &str) -> ResearchSummary {
        ResearchSummary {
            title: title.to_string(),
            url: format!("https://example.org/{title}"),
            key_points: vec!["point".into()],
            expert_quotes: vec![],
            data_points: vec![],
            relevance_score: 80,
            source_authority: AuthorityTier::Medium,
            publication_date: None,
            origin: SummaryOrigin::Sourced,
        }
    }

    fn kw(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_key_is_normalized_and_order_independent() {
        let a = CacheKey::new("  Rust   Async ", &kw(&["Tokio", "futures", "tokio"]));
        let b = CacheKey::new("rust async", &kw(&["futures", "TOKIO", " "]));
        assert_eq!(a, b);
        assert_ne!(a, CacheKey::new("rust async", &kw(&["futures"])));
    }

    #[test]
    fn test_key_applies_nfkc() {
        // Fullwidth letters fold to ASCII under NFKC.
        let a = CacheKey::new("ＲＵＳＴ", &[]);
        assert_eq!(a, CacheKey::new("rust", &[]));
    }

    #[test]
    fn test_hit_then_expire_on_read() {
        let cache = ResearchCache::new(4, Duration::from_secs(60));
        let key = CacheKey::new("topic", &[]);
        let t0 = Instant::now();
        assert!(cache.put_at(key.clone(), vec![summary("a")], t0));

        let hit = cache.get_at(&key, t0 + Duration::from_secs(59));
        assert_eq!(hit.map(|s| s.len()), Some(1));

        assert!(cache.get_at(&key, t0 + Duration::from_secs(60)).is_none());
        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.expirations), (1, 1, 1));
    }

    #[test]
    fn test_empty_results_not_cached() {
        let cache = ResearchCache::new(4, Duration::from_secs(60));
        assert!(!cache.put(CacheKey::new("t", &[]), vec![]));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_lru() {
        let cache = ResearchCache::new(2, Duration::from_secs(60));
        let (a, b, c) = (
            CacheKey::new("a", &[]),
            CacheKey::new("b", &[]),
            CacheKey::new("c", &[]),
        );
        cache.put(a.clone(), vec![summary("a")]);
        cache.put(b.clone(), vec![summary("b")]);
        assert!(cache.get(&a).is_some());
        cache.put(c.clone(), vec![summary("c")]);

        assert!(cache.get(&b).is_none());
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&c).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_same_key_is_not_eviction() {
        let cache = ResearchCache::new(2, Duration::from_secs(60));
        let key = CacheKey::new("a", &[]);
        cache.put(key.clone(), vec![summary("a")]);
        cache.put(key.clone(), vec![summary("a2")]);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get(&key).unwrap()[0].title, "a2");
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let cache = ResearchCache::new(4, Duration::from_secs(10));
        let t0 = Instant::now();
        cache.put_at(CacheKey::new("old", &[]), vec![summary("o")], t0);
        cache.put_at(
            CacheKey::new("new", &[]),
            vec![summary("n")],
            t0 + Duration::from_secs(8),
        );
        assert_eq!(cache.sweep_expired_at(t0 + Duration::from_secs(12)), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_single_flight_serializes_same_key() {
        let cache = Arc::new(ResearchCache::new(4, Duration::from_secs(60)));
        let key = CacheKey::new("cold", &[]);
        let computed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            let computed = Arc::clone(&computed);
            handles.push(tokio::spawn(async move {
                if let Some(hit) = cache.get(&key) {
                    return hit;
                }
                let _flight = cache.begin_flight(&key).await;
                if let Some(hit) = cache.get(&key) {
                    return hit;
                }
                computed.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                let result = vec![summary("fresh")];
                cache.put(key.clone(), result.clone());
                result
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap()[0].title, "fresh");
        }
        assert_eq!(computed.load(Ordering::SeqCst), 1);
        assert_eq!(cache.flights_in_progress(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_cache_dropped() {
        let cache = Arc::new(ResearchCache::new(4, Duration::from_millis(5)));
        let handle = cache.spawn_sweeper(Duration::from_millis(10));
        cache.put(CacheKey::new("x", &[]), vec![summary("x")]);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.is_empty());
        drop(cache);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
