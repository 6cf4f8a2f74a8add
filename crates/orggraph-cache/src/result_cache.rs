use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;

/// A cached value with its bookkeeping. `expires_at = created_at + ttl`;
/// the value and expiry are immutable once created (refresh replaces the
/// whole entry), only the access bookkeeping is updated on hits.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub access_count: u64,
    pub last_accessed_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
            access_count: 0,
            last_accessed_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Instant::now();
    }
}

/// Cache performance counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Recency order: front = least recently used, back = most recent.
    recency: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<V> Inner<V> {
    fn bump_recency(&mut self, key: &str) {
        self.recency.retain(|k| k != key);
        self.recency.push_back(key.to_string());
    }

    fn drop_entry(&mut self, key: &str) {
        self.entries.remove(key);
        self.recency.retain(|k| k != key);
    }
}

/// TTL + strict-LRU result cache.
///
/// All reads and writes are serialized by one mutex: coarse-grained by
/// design, making every cache operation linearizable with respect to the
/// others. Expired entries are removed lazily on access and counted as
/// misses; inserting a new key at capacity evicts exactly the
/// least-recently-used entry first.
pub struct ResultCache<V> {
    inner: Mutex<Inner<V>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(max_entries),
                recency: VecDeque::with_capacity(max_entries),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            default_ttl,
            max_entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                inner.misses += 1;
                return None;
            }
        };

        if expired {
            inner.drop_entry(key);
            inner.misses += 1;
            debug!(key, "cache entry expired, removed lazily");
            return None;
        }

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.touch();
            let value = entry.value.clone();
            inner.bump_recency(key);
            inner.hits += 1;
            return Some(value);
        }
        inner.misses += 1;
        None
    }

    pub fn put(&self, key: &str, value: V) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    pub fn put_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(key) {
            // Refresh replaces the entry wholesale.
            inner.entries.insert(key.to_string(), CacheEntry::new(value, ttl));
            inner.bump_recency(key);
            return;
        }

        if inner.entries.len() >= self.max_entries {
            if let Some(victim) = inner.recency.pop_front() {
                inner.entries.remove(&victim);
                inner.evictions += 1;
                debug!(victim = %victim, "evicted least-recently-used cache entry");
            }
        }

        inner.entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        inner.recency.push_back(key.to_string());
    }

    /// Remove entries. `None` clears everything; a pattern removes keys
    /// containing that substring (a blunt, non-indexed match). Returns the
    /// number of entries removed.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut inner = self.inner.lock();
        match pattern {
            None => {
                let removed = inner.entries.len();
                inner.entries.clear();
                inner.recency.clear();
                debug!(removed, "cleared result cache");
                removed
            }
            Some(pattern) => {
                let victims: Vec<String> = inner
                    .entries
                    .keys()
                    .filter(|k| k.contains(pattern))
                    .cloned()
                    .collect();
                for key in &victims {
                    inner.drop_entry(key);
                }
                debug!(pattern, removed = victims.len(), "invalidated cache entries by pattern");
                victims.len()
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            entries: inner.entries.len(),
            max_entries: self.max_entries,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> ResultCache<String> {
        ResultCache::new(3, Duration::from_secs(60))
    }

    #[test]
    fn hit_after_put() {
        let cache = cache();
        cache.put("k1", "v1".to_string());
        assert_eq!(cache.get("k1"), Some("v1".to_string()));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn capacity_overflow_evicts_exactly_the_lru_victim() {
        let cache = cache();
        cache.put("k1", "v1".to_string());
        cache.put("k2", "v2".to_string());
        cache.put("k3", "v3".to_string());
        cache.put("k4", "v4".to_string());

        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.get("k2"), Some("v2".to_string()));
        assert_eq!(cache.get("k3"), Some("v3".to_string()));
        assert_eq!(cache.get("k4"), Some("v4".to_string()));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn get_refreshes_recency_order() {
        let cache = cache();
        cache.put("k1", "v1".to_string());
        cache.put("k2", "v2".to_string());
        cache.put("k3", "v3".to_string());

        // k1 becomes most recent; k2 is now the LRU victim.
        assert!(cache.get("k1").is_some());
        cache.put("k4", "v4".to_string());

        assert_eq!(cache.get("k2"), None);
        assert_eq!(cache.get("k1"), Some("v1".to_string()));
    }

    #[test]
    fn expired_entry_is_a_miss_and_is_removed() {
        let cache = ResultCache::new(3, Duration::from_millis(10));
        cache.put("k1", "v1".to_string());
        std::thread::sleep(Duration::from_millis(25));

        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.len(), 0);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn refresh_replaces_entry_and_expiry() {
        let cache = cache();
        cache.put_with_ttl("k1", "old".to_string(), Duration::from_millis(10));
        cache.put_with_ttl("k1", "new".to_string(), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(25));

        assert_eq!(cache.get("k1"), Some("new".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_all_and_by_pattern() {
        let cache = cache();
        cache.put("centrality:degree:aaaa", "a".to_string());
        cache.put("community:label_propagation:bbbb", "b".to_string());
        cache.put("centrality:pagerank:cccc", "c".to_string());

        assert_eq!(cache.invalidate(Some("centrality")), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("community:label_propagation:bbbb").is_some());

        assert_eq!(cache.invalidate(None), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn hit_rate_reflects_lookups() {
        let cache = cache();
        cache.put("k1", "v1".to_string());
        cache.get("k1");
        cache.get("k1");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }
}
