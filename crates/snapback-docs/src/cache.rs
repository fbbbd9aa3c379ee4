//! Documentation cache (§3, §4.10): cache-first lookups keyed by a
//! URL-encoded string that incorporates the optional `topic`/`tokens`
//! parameters, per-class TTL, lazy eviction on access.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use snapback_domain::model::{DocCacheClass, DocCacheEntry};

pub struct DocCache {
    entries: RwLock<HashMap<String, DocCacheEntry>>,
}

impl Default for DocCache {
    fn default() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }
}

/// Cache key for `resolveLibraryId(libraryName)`.
pub fn resolve_key(library_name: &str) -> String {
    format!("resolve:{}", urlencoding::encode(library_name))
}

/// Cache key for `getLibraryDocs(libraryId, { topic?, tokens? })`.
pub fn docs_key(library_id: &str, topic: Option<&str>, tokens: Option<u32>) -> String {
    let mut key = format!("docs:{}", urlencoding::encode(library_id));
    if let Some(topic) = topic {
        key.push_str(&format!("?topic={}", urlencoding::encode(topic)));
    }
    if let Some(tokens) = tokens {
        key.push_str(&format!("&tokens={tokens}"));
    }
    key
}

impl DocCache {
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Utc::now();
        let hit = {
            let entries = self.entries.read();
            entries.get(key).filter(|e| !e.is_expired(now)).map(|e| e.value.clone())
        };
        if hit.is_none() {
            self.entries.write().remove(key);
        }
        hit
    }

    pub fn insert(&self, key: String, value: Value, class: DocCacheClass, ttl_secs: i64) {
        let now = Utc::now();
        let entry = DocCacheEntry {
            value,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
            class,
        };
        self.entries.write().insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodic sweep: drops every expired entry, independent of `get`'s
    /// lazy eviction.
    pub fn sweep_expired(&self) {
        let now = Utc::now();
        self.entries.write().retain(|_, entry| !entry.is_expired(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn docs_key_url_encodes_topic() {
        let key = docs_key("react/react", Some("hooks & effects"), Some(500));
        assert!(key.contains("hooks%20%26%20effects") || key.contains("hooks+%26+effects"));
        assert!(key.ends_with("&tokens=500"));
    }

    #[test]
    fn insert_then_get_hits_before_expiry() {
        let cache = DocCache::default();
        cache.insert("k".into(), json!({"a": 1}), DocCacheClass::Search, 60);
        assert_eq!(cache.get("k"), Some(json!({"a": 1})));
    }

    #[test]
    fn expired_entry_misses_and_is_evicted() {
        let cache = DocCache::default();
        cache.insert("k".into(), json!({"a": 1}), DocCacheClass::Docs, -1);
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_expired_removes_stale_entries_without_touching_fresh_ones() {
        let cache = DocCache::default();
        cache.insert("stale".into(), json!(1), DocCacheClass::Search, -1);
        cache.insert("fresh".into(), json!(2), DocCacheClass::Search, 60);
        cache.sweep_expired();
        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh").is_some());
    }
}
