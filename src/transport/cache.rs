use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;

/// Cache key for a fully resolved request URL
pub fn fingerprint(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

struct Entry {
    body: String,
    stored_at: Instant,
}

/// Small in-memory cache of successful response bodies.
///
/// Entries expire after `ttl`; once `capacity` is reached the oldest entry
/// is evicted first.
pub struct ResponseCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.stored_at.elapsed() >= self.ttl,
            None => return None,
        };

        if expired {
            self.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.body.clone())
    }

    pub fn insert(&mut self, key: String, body: String) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.contains_key(&key) {
            self.remove(&key);
        }

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            Entry {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint("https://newsapi.org/v2/everything?q=a");
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint("https://newsapi.org/v2/everything?q=a"));
        assert_ne!(a, fingerprint("https://newsapi.org/v2/everything?q=b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let mut cache = ResponseCache::new(4, Duration::from_secs(30));
        cache.insert("k".into(), "body".into());
        assert_eq!(cache.get("k").as_deref(), Some("body"));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oldest_entry_evicted_at_capacity() {
        let mut cache = ResponseCache::new(2, Duration::from_secs(30));
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        cache.insert("c".into(), "3".into());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("c").as_deref(), Some("3"));
    }

    #[test]
    fn test_reinsert_refreshes_position() {
        let mut cache = ResponseCache::new(2, Duration::from_secs(30));
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        cache.insert("a".into(), "1b".into());
        cache.insert("c".into(), "3".into());

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a").as_deref(), Some("1b"));
    }
}
