use crate::domain::query::QueryResponse;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default cache size
pub const DEFAULT_QUERY_CACHE_SIZE: usize = 500;

/// Key/value store for finished responses.
pub trait QueryCache: Send + Sync {
    fn get(&self, key: &str) -> Option<QueryResponse>;
    fn set(&self, key: &str, value: QueryResponse, ttl: Duration);
}

/// Cache key for a question: `ai_query_<sha256 of the trimmed text>`.
pub fn cache_key(question: &str) -> String {
    let digest = Sha256::digest(question.trim().as_bytes());
    format!("ai_query_{}", hex::encode(digest))
}

#[derive(Clone)]
struct CacheEntry {
    response: QueryResponse,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// LRU cache with per-entry TTL
struct ResponseCache {
    cache: HashMap<String, CacheEntry>,
    max_size: usize,
    access_order: Vec<String>,
}

impl ResponseCache {
    fn new(max_size: usize) -> Self {
        Self {
            cache: HashMap::new(),
            max_size: max_size.max(1),
            access_order: Vec::new(),
        }
    }

    fn get(&mut self, key: &str) -> Option<QueryResponse> {
        let result = self
            .cache
            .get(key)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.response.clone());

        if result.is_some() {
            self.touch(key);
        } else {
            // Remove expired entry if exists
            if self.cache.remove(key).is_some() {
                self.access_order.retain(|k| k != key);
            }
        }

        result
    }

    fn put(&mut self, key: &str, response: QueryResponse, ttl: Duration) {
        if self.cache.contains_key(key) {
            self.access_order.retain(|k| k != key);
        } else {
            // Evict oldest entries if at capacity
            while self.cache.len() >= self.max_size && !self.access_order.is_empty() {
                let oldest = self.access_order.remove(0);
                self.cache.remove(&oldest);
            }
        }

        self.cache.insert(
            key.to_string(),
            CacheEntry {
                response,
                created_at: Instant::now(),
                ttl,
            },
        );
        self.access_order.push(key.to_string());
    }

    fn touch(&mut self, key: &str) {
        self.access_order.retain(|k| k != key);
        self.access_order.push(key.to_string());
    }
}

/// Process-local [`QueryCache`].
pub struct InMemoryQueryCache {
    inner: Mutex<ResponseCache>,
}

impl InMemoryQueryCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(ResponseCache::new(max_size)),
        }
    }
}

impl Default for InMemoryQueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_CACHE_SIZE)
    }
}

impl QueryCache for InMemoryQueryCache {
    fn get(&self, key: &str) -> Option<QueryResponse> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
    }

    fn set(&self, key: &str, value: QueryResponse, ttl: Duration) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(key, value, ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(question: &str) -> QueryResponse {
        QueryResponse {
            success: true,
            original_query: question.to_string(),
            sql_query: Some("SELECT name FROM employees ORDER BY name LIMIT 20;".to_string()),
            data: Vec::new(),
            columns: vec!["name".to_string()],
            row_count: 0,
            cached: false,
            error: None,
        }
    }

    #[test]
    fn test_cache_key_ignores_surrounding_whitespace() {
        let key = cache_key("  Show all employees \n");
        assert_eq!(key, cache_key("Show all employees"));
        assert!(key.starts_with("ai_query_"));
        assert_eq!(key.len(), "ai_query_".len() + 64);
        assert_ne!(key, cache_key("show all employees"));
    }

    #[test]
    fn test_get_returns_stored_value() {
        let cache = InMemoryQueryCache::default();
        cache.set("k", response("q"), Duration::from_secs(300));
        assert_eq!(cache.get("k").unwrap().original_query, "q");
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_expired_entry_is_dropped() {
        let cache = InMemoryQueryCache::default();
        cache.set("k", response("q"), Duration::ZERO);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = InMemoryQueryCache::new(2);
        let ttl = Duration::from_secs(300);
        cache.set("a", response("a"), ttl);
        cache.set("b", response("b"), ttl);
        assert!(cache.get("a").is_some());
        cache.set("c", response("c"), ttl);

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }
}
