//! In-memory response cache for external API calls.

use crate::api::transport::Params;
use lru::LruCache;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Instant;

/// Storage for cached responses; the implementation decides what gets
/// dropped when a new entry arrives.
pub trait EvictionPolicy: Send + std::fmt::Debug {
    /// Looks up `key`, counting it as a use.
    fn get(&mut self, key: &str) -> Option<&CacheEntry>;

    /// Stores `entry`, evicting whatever the policy chooses.
    fn put(&mut self, key: String, entry: CacheEntry);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

/// Never evicts.
#[derive(Debug, Default)]
pub struct Unbounded {
    entries: HashMap<String, CacheEntry>,
}

impl EvictionPolicy for Unbounded {
    fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    fn put(&mut self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Drops the least recently used entry once `capacity` is reached.
#[derive(Debug)]
pub struct Lru {
    entries: LruCache<String, CacheEntry>,
}

impl Lru {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl EvictionPolicy for Lru {
    fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    fn put(&mut self, key: String, entry: CacheEntry) {
        self.entries.put(key, entry);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub cached_at: Instant,
}

/// Cache key: the URL followed by the parameters in key order.
pub fn cache_key(url: &str, params: &Params) -> String {
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    if query.is_empty() {
        url.to_owned()
    } else {
        format!("{url}?{}", query.join("&"))
    }
}

#[derive(Debug)]
pub struct ResponseCache {
    store: Mutex<Box<dyn EvictionPolicy>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Unbounded::default())
    }
}

impl ResponseCache {
    pub fn new(policy: impl EvictionPolicy + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(policy)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut store = self.store.lock().ok()?;
        store.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: String, value: Value) {
        if let Ok(mut store) = self.store.lock() {
            store.put(
                key,
                CacheEntry {
                    value,
                    cached_at: Instant::now(),
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut store) = self.store.lock() {
            store.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_is_order_independent() {
        let mut a = Params::new();
        a.insert("b".into(), "2".into());
        a.insert("a".into(), "1".into());
        let mut b = Params::new();
        b.insert("a".into(), "1".into());
        b.insert("b".into(), "2".into());

        assert_eq!(cache_key("https://x", &a), "https://x?a=1&b=2");
        assert_eq!(cache_key("https://x", &a), cache_key("https://x", &b));
        assert_eq!(cache_key("https://x", &Params::new()), "https://x");
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let cache = ResponseCache::default();
        for i in 0..50 {
            cache.insert(format!("k{i}"), json!(i));
        }
        assert_eq!(cache.len(), 50);
        assert_eq!(cache.get("k7"), Some(json!(7)));
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let cache = ResponseCache::new(Lru::new(2));
        cache.insert("a".into(), json!(1));
        cache.insert("b".into(), json!(2));
        assert!(cache.get("a").is_some());
        cache.insert("c".into(), json!(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_lru_overwrite_does_not_evict() {
        let cache = ResponseCache::new(Lru::new(1));
        cache.insert("a".into(), json!(1));
        cache.insert("a".into(), json!(2));
        assert_eq!(cache.get("a"), Some(json!(2)));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_zero_capacity_holds_one() {
        let policy = Lru::new(0);
        assert_eq!(policy.capacity(), 1);
        let cache = ResponseCache::new(policy);
        cache.insert("a".into(), json!(1));
        cache.insert("b".into(), json!(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b"), Some(json!(2)));
    }
}
