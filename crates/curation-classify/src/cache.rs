//! TTL cache keyed by canonical URL. A hit sets `from_cache=true` on the
//! returned classification and is always used unless `forceRefresh` is set
//! (§4.3).

use std::time::{Duration, Instant};

use dashmap::DashMap;

use curation_core::Classification;

struct Entry {
    classification: Classification,
    expires_at: Instant,
}

pub struct ClassifierCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl ClassifierCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, canonical_url: &str) -> Option<Classification> {
        let entry = self.entries.get(canonical_url)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(canonical_url);
            return None;
        }
        let mut classification = entry.classification.clone();
        classification.from_cache = true;
        Some(classification)
    }

    pub fn insert(&self, canonical_url: String, classification: Classification) {
        self.entries.insert(
            canonical_url,
            Entry {
                classification,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, canonical_url: &str) {
        self.entries.remove(canonical_url);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification() -> Classification {
        Classification {
            segment: 'T',
            category: "DEV".to_string(),
            content_type: 'A',
            organization: "UNKN".to_string(),
            confidence: 0.8,
            reasoning: None,
            from_cache: false,
            fallback: false,
        }
    }

    #[test]
    fn hit_sets_from_cache() {
        let cache = ClassifierCache::new(Duration::from_secs(3600));
        cache.insert("https://a.example.com".to_string(), classification());
        let hit = cache.get("https://a.example.com").unwrap();
        assert!(hit.from_cache);
    }

    #[test]
    fn miss_returns_none() {
        let cache = ClassifierCache::new(Duration::from_secs(3600));
        assert!(cache.get("https://nothing.example.com").is_none());
    }

    #[test]
    fn expired_entry_is_evicted() {
        let cache = ClassifierCache::new(Duration::from_millis(0));
        cache.insert("https://a.example.com".to_string(), classification());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("https://a.example.com").is_none());
        assert!(cache.is_empty());
    }
}
