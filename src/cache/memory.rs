//! In-memory cache implementation using moka
//!
//! Thread-safe cache with TTL-based expiration and glob-style pattern
//! invalidation for bulk deletes.

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

/// Cache entry wrapper storing serialized JSON so any serde type can share
/// one cache instance.
#[derive(Clone)]
struct CacheEntry {
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
pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
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
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
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

    /// Glob-style key matching: `*` matches any run, `?` a single character.
    fn pattern_matches(pattern: &str, key: &str) -> bool {
        let pattern_chars: Vec<char> = pattern.chars().collect();
        let key_chars: Vec<char> = key.chars().collect();
        Self::glob_match(&pattern_chars, &key_chars, 0, 0)
    }

    fn glob_match(pattern: &[char], key: &[char], pi: usize, ki: usize) -> bool {
        if pi == pattern.len() {
            return ki == key.len();
        }

        match pattern[pi] {
            '*' => {
                if Self::glob_match(pattern, key, pi + 1, ki) {
                    return true;
                }
                ki < key.len() && Self::glob_match(pattern, key, pi, ki + 1)
            }
            '?' => ki < key.len() && Self::glob_match(pattern, key, pi + 1, ki + 1),
            p => ki < key.len() && key[ki] == p && Self::glob_match(pattern, key, pi + 1, ki + 1),
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
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        _ttl: Duration,
    ) -> Result<()> {
        // moka applies the cache-wide time_to_live; the per-call TTL is kept
        // in the signature for interface stability
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
            .map_err(|e| anyhow::anyhow!("Failed to invalidate cache entries: {}", e))?;
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

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();

        cache
            .set("key1", &"value1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = MemoryCache::new();
        let result: Option<String> = cache.get("missing").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_overwrite_existing_key() {
        let cache = MemoryCache::new();

        cache
            .set("key", &"old".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("key", &"new".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("key").await.unwrap();
        assert_eq!(result, Some("new".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new();

        cache
            .set("key", &"value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("key").await.unwrap();

        let result: Option<String> = cache.get("key").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_complex_types() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct TestStruct {
            id: i64,
            name: String,
            tags: Vec<String>,
        }

        let cache = MemoryCache::new();
        let value = TestStruct {
            id: 42,
            name: "test".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
        };

        cache.set("struct", &value, Duration::from_secs(60)).await.unwrap();

        let result: Option<TestStruct> = cache.get("struct").await.unwrap();
        assert_eq!(result, Some(value));
    }

    #[test]
    fn test_pattern_matching() {
        assert!(MemoryCache::pattern_matches("posts:*", "posts:123"));
        assert!(MemoryCache::pattern_matches("posts:*", "posts:"));
        assert!(!MemoryCache::pattern_matches("posts:*", "users:123"));
        assert!(MemoryCache::pattern_matches("user:?:profile", "user:1:profile"));
        assert!(!MemoryCache::pattern_matches("user:?:profile", "user:12:profile"));
        assert!(MemoryCache::pattern_matches("*", "anything"));
        assert!(MemoryCache::pattern_matches("exact", "exact"));
        assert!(!MemoryCache::pattern_matches("exact", "exactly"));
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
            .set("users:1", &"c".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        cache.delete_pattern("posts:*").await.unwrap();

        // Invalidation closures run lazily; reads observe the tombstones
        let p1: Option<String> = cache.get("posts:1").await.unwrap();
        let p2: Option<String> = cache.get("posts:2").await.unwrap();
        let u1: Option<String> = cache.get("users:1").await.unwrap();
        assert_eq!(p1, None);
        assert_eq!(p2, None);
        assert_eq!(u1, Some("c".to_string()));
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
        assert_eq!(a, None);
        assert_eq!(b, None);
    }
}
