// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! A single capacity-bounded response cache with FIFO eviction.
//!
//! Entries live in a `VecDeque` in insertion order, so "oldest" is simply the
//! front of the queue. Eviction never looks at access recency: a tile that was
//! just served is evicted before a younger one if it was inserted earlier.
//!
//! Writes never fail for lack of room; the namespace overfills by one entry
//! and [`BoundedCache::trim`] pops the overflow from the front.

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::request::{RequestIdentity, ResponseSnapshot, ResponseSource};

/// Name and capacity of one cache namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNamespace {
    pub name: String,
    pub max_entries: usize,
}

impl CacheNamespace {
    #[must_use]
    pub fn new(name: impl Into<String>, max_entries: usize) -> Self {
        Self {
            name: name.into(),
            max_entries,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    key: RequestIdentity,
    value: ResponseSnapshot,
}

pub struct BoundedCache {
    namespace: CacheNamespace,
    entries: Mutex<VecDeque<CacheEntry>>,
}

impl BoundedCache {
    #[must_use]
    pub fn new(namespace: CacheNamespace) -> Self {
        Self {
            namespace,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.namespace.name
    }

    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.namespace.max_entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Look up a snapshot. Hits are returned tagged as cache-sourced.
    #[must_use]
    pub fn get(&self, key: &RequestIdentity) -> Option<ResponseSnapshot> {
        self.entries
            .lock()
            .iter()
            .find(|entry| &entry.key == key)
            .map(|entry| entry.value.clone().with_source(ResponseSource::Cache))
    }

    #[must_use]
    pub fn contains(&self, key: &RequestIdentity) -> bool {
        self.entries.lock().iter().any(|entry| &entry.key == key)
    }

    /// Store a snapshot as the newest entry.
    ///
    /// An existing entry for the same key is replaced and moves to the back.
    /// Does not trim.
    pub fn insert(&self, key: RequestIdentity, value: ResponseSnapshot) {
        let mut entries = self.entries.lock();
        if let Some(pos) = entries.iter().position(|entry| entry.key == key) {
            entries.remove(pos);
        }
        entries.push_back(CacheEntry { key, value });
    }

    /// Evict the oldest `len - max_entries` entries, if any.
    ///
    /// Returns the evicted keys, oldest first.
    pub fn trim(&self) -> Vec<RequestIdentity> {
        let mut entries = self.entries.lock();
        let overflow = entries.len().saturating_sub(self.namespace.max_entries);
        entries.drain(..overflow).map(|entry| entry.key).collect()
    }

    pub fn remove(&self, key: &RequestIdentity) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|entry| &entry.key == key) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Keys in insertion order, oldest first.
    #[must_use]
    pub fn keys(&self) -> Vec<RequestIdentity> {
        self.entries.lock().iter().map(|entry| entry.key.clone()).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn key(path: &str) -> RequestIdentity {
        RequestIdentity::new("GET", &Url::parse(&format!("https://tile.example/{path}")).unwrap())
    }

    fn snapshot(body: &'static str) -> ResponseSnapshot {
        ResponseSnapshot::new(200, body)
    }

    fn cache(max: usize) -> BoundedCache {
        BoundedCache::new(CacheNamespace::new("tiles-test", max))
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = cache(4);
        assert!(cache.is_empty());
        assert_eq!(cache.name(), "tiles-test");
        assert_eq!(cache.max_entries(), 4);
    }

    #[test]
    fn test_insert_and_get_marks_cache_source() {
        let cache = cache(4);
        cache.insert(key("a"), snapshot("A"));

        let hit = cache.get(&key("a")).unwrap();
        assert_eq!(hit.body.as_ref(), b"A");
        assert_eq!(hit.source, ResponseSource::Cache);
        assert!(cache.get(&key("b")).is_none());
    }

    #[test]
    fn test_fifo_trim_keeps_newest() {
        let cache = cache(2);
        for name in ["a", "b", "c"] {
            cache.insert(key(name), snapshot("x"));
            cache.trim();
        }
        assert_eq!(cache.keys(), vec![key("b"), key("c")]);
    }

    #[test]
    fn test_trim_removes_exactly_overflow() {
        let cache = cache(3);
        for i in 0..7 {
            cache.insert(key(&i.to_string()), snapshot("x"));
        }
        let evicted = cache.trim();
        assert_eq!(evicted, vec![key("0"), key("1"), key("2"), key("3")]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_trim_under_capacity_is_noop() {
        let cache = cache(5);
        cache.insert(key("a"), snapshot("x"));
        assert!(cache.trim().is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reads_do_not_protect_from_eviction() {
        let cache = cache(2);
        cache.insert(key("a"), snapshot("x"));
        cache.insert(key("b"), snapshot("x"));
        let _ = cache.get(&key("a"));
        cache.insert(key("c"), snapshot("x"));
        cache.trim();

        assert!(!cache.contains(&key("a")));
        assert!(cache.contains(&key("b")));
    }

    #[test]
    fn test_reinsert_replaces_and_moves_to_back() {
        let cache = cache(2);
        cache.insert(key("a"), snapshot("old"));
        cache.insert(key("b"), snapshot("x"));
        cache.insert(key("a"), snapshot("new"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec![key("b"), key("a")]);

        cache.insert(key("c"), snapshot("x"));
        cache.trim();
        assert_eq!(cache.get(&key("a")).unwrap().body.as_ref(), b"new");
        assert!(!cache.contains(&key("b")));
    }

    #[test]
    fn test_zero_capacity_evicts_everything() {
        let cache = cache(0);
        cache.insert(key("a"), snapshot("x"));
        assert_eq!(cache.trim().len(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = cache(4);
        cache.insert(key("a"), snapshot("x"));
        cache.insert(key("b"), snapshot("x"));

        assert!(cache.remove(&key("a")));
        assert!(!cache.remove(&key("a")));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
