//! LRU-with-TTL auth cache (§4.3): keyed by raw key, capped at 60s/1000
//! entries. A plain `HashMap` plus an insertion-ordered `VecDeque` gives
//! O(1) lookup and amortized-O(1) eviction without pulling in an LRU crate
//! for a cache this small — the same trade the teacher makes for its
//! doc-cache-sized maps.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use snapback_domain::model::AuthResult;

const DEFAULT_TTL: Duration = Duration::from_secs(60);
const DEFAULT_CAPACITY: usize = 1000;

struct Entry {
    result: AuthResult,
    inserted_at: Instant,
}

pub struct AuthCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<(HashMap<String, Entry>, VecDeque<String>)>,
}

impl AuthCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new((HashMap::new(), VecDeque::new())),
        }
    }

    pub fn get(&self, raw_key: &str) -> Option<AuthResult> {
        let mut guard = self.entries.lock();
        let (map, _) = &mut *guard;
        match map.get(raw_key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.result.clone()),
            Some(_) => {
                map.remove(raw_key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, raw_key: String, result: AuthResult) {
        let mut guard = self.entries.lock();
        let (map, order) = &mut *guard;

        if !map.contains_key(&raw_key) {
            order.push_back(raw_key.clone());
        }
        map.insert(
            raw_key,
            Entry {
                result,
                inserted_at: Instant::now(),
            },
        );

        while map.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                map.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuthCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapback_domain::model::Tier;

    fn sample() -> AuthResult {
        AuthResult {
            valid: true,
            tier: Tier::Pro,
            permissions: vec![],
            user_id: None,
            org_id: None,
            error: None,
        }
    }

    #[test]
    fn hit_after_insert() {
        let cache = AuthCache::new();
        cache.insert("key-a".into(), sample());
        assert!(cache.get("key-a").is_some());
    }

    #[test]
    fn expires_after_ttl() {
        let cache = AuthCache::with_limits(Duration::from_millis(5), 10);
        cache.insert("key-a".into(), sample());
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("key-a").is_none());
    }

    #[test]
    fn evicts_oldest_over_capacity() {
        let cache = AuthCache::with_limits(DEFAULT_TTL, 2);
        cache.insert("a".into(), sample());
        cache.insert("b".into(), sample());
        cache.insert("c".into(), sample());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
    }
}
