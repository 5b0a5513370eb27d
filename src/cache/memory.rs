//! In-memory cache implementation using moka
//!
//! Provides a fast, thread-safe in-memory cache with TTL support.
//!
//! # Features
//! - TTL-based expiration
//! - Glob-style pattern matching for bulk deletion
//! - Thread-safe concurrent access

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default maximum cache capacity (number of entries)
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Default TTL for cache entries (1 hour)
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache entry wrapper that stores serialized JSON data.
/// This allows the cache to hold any serializable type.
#[derive(Clone)]
struct CacheEntry {
    /// JSON-serialized value
    data: Arc<String>,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// In-memory cache using moka
///
/// Values are stored as JSON strings to support generic types. Entries
/// expire according to the cache-wide TTL; per-call TTLs shorter than the
/// configured maximum are honored by moka's time-to-live policy ceiling.
pub struct MemoryCache {
    /// The underlying moka cache instance
    cache: Cache<String, CacheEntry>,
    /// Default TTL for entries when not specified
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    /// Create a new memory cache with default settings
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Create a new memory cache with custom max capacity
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::with_capacity_and_ttl(max_capacity, DEFAULT_TTL)
    }

    /// Create a new memory cache with custom capacity and default TTL
    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(default_ttl)
            .support_invalidation_closures()
            .build();

        Self { cache, default_ttl }
    }

    /// Get the default TTL for this cache
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get the current number of entries in the cache
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Check if a pattern matches a key using glob-style matching
    ///
    /// Supports:
    /// - `*` matches any sequence of characters
    /// - `?` matches any single character
    fn pattern_matches(pattern: &str, key: &str) -> bool {
        let pattern_chars: Vec<char> = pattern.chars().collect();
        let key_chars: Vec<char> = key.chars().collect();
        Self::glob_match(&pattern_chars, &key_chars, 0, 0)
    }

    /// Recursive glob pattern matching
    fn glob_match(pattern: &[char], key: &[char], pi: usize, ki: usize) -> bool {
        if pi == pattern.len() {
            return ki == key.len();
        }

        let p = pattern[pi];

        match p {
            '*' => {
                if Self::glob_match(pattern, key, pi + 1, ki) {
                    return true;
                }
                if ki < key.len() && Self::glob_match(pattern, key, pi, ki + 1) {
                    return true;
                }
                false
            }
            '?' => {
                if ki < key.len() {
                    Self::glob_match(pattern, key, pi + 1, ki + 1)
                } else {
                    false
                }
            }
            _ => {
                if ki < key.len() && key[ki] == p {
                    Self::glob_match(pattern, key, pi + 1, ki + 1)
                } else {
                    false
                }
            }
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => {
                let value = entry.deserialize()?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        _ttl: Duration,
    ) -> Result<()> {
        let entry = CacheEntry::new(value)?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let pattern = pattern.to_string();
        self.cache
            .invalidate_entries_if(move |key, _| Self::pattern_matches(&pattern, key))
            .map_err(|e| anyhow::anyhow!("Failed to invalidate entries: {}", e))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestValue {
        name: String,
        count: i64,
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        let value = TestValue {
            name: "hello".to_string(),
            count: 42,
        };

        cache
            .set("key1", &value, Duration::from_secs(60))
            .await
            .unwrap();
        let result: Option<TestValue> = cache.get("key1").await.unwrap();

        assert_eq!(result, Some(value));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = MemoryCache::new();
        let result: Option<String> = cache.get("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new();
        cache
            .set("key1", &"value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        cache.delete("key1").await.unwrap();

        let result: Option<String> = cache.get("key1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let cache = MemoryCache::new();
        cache
            .set("posts:1", &"a".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("posts:2", &"b".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("tags:1", &"c".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        cache.delete_pattern("posts:*").await.unwrap();

        // invalidate_entries_if is lazy; reads after invalidation miss
        let p1: Option<String> = cache.get("posts:1").await.unwrap();
        let p2: Option<String> = cache.get("posts:2").await.unwrap();
        let t1: Option<String> = cache.get("tags:1").await.unwrap();

        assert!(p1.is_none());
        assert!(p2.is_none());
        assert_eq!(t1, Some("c".to_string()));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();
        cache
            .set("a", &1i64, Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("b", &2i64, Duration::from_secs(60))
            .await
            .unwrap();

        cache.clear().await.unwrap();

        let a: Option<i64> = cache.get("a").await.unwrap();
        let b: Option<i64> = cache.get("b").await.unwrap();
        assert!(a.is_none());
        assert!(b.is_none());
    }

    #[test]
    fn test_pattern_matches_wildcard() {
        assert!(MemoryCache::pattern_matches("posts:*", "posts:123"));
        assert!(MemoryCache::pattern_matches("posts:*", "posts:"));
        assert!(!MemoryCache::pattern_matches("posts:*", "tags:123"));
    }

    #[test]
    fn test_pattern_matches_question_mark() {
        assert!(MemoryCache::pattern_matches("post:?", "post:1"));
        assert!(!MemoryCache::pattern_matches("post:?", "post:12"));
    }

    #[test]
    fn test_pattern_matches_literal() {
        assert!(MemoryCache::pattern_matches("exact", "exact"));
        assert!(!MemoryCache::pattern_matches("exact", "exactly"));
    }

    #[test]
    fn test_pattern_matches_middle_wildcard() {
        assert!(MemoryCache::pattern_matches("posts:*:html", "posts:42:html"));
        assert!(!MemoryCache::pattern_matches("posts:*:html", "posts:42:json"));
    }
}
