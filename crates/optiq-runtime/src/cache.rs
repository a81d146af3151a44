//! Caching layer for extracted features.
//!
//! Extraction is the slow half of a run; scoring the same file twice
//! should only pay for it once. Keys carry the extractor name so two
//! extractors never share entries for the same path.

use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::Duration;

use moka::future::Cache;

use optiq_core::ContentFeatures;

use crate::config::CacheConfig;

/// Cache key for extracted features.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheKey {
    path_hash: u64,
    extractor: String,
}

impl CacheKey {
    pub fn new(path: &Path, extractor: &str) -> Self {
        Self {
            path_hash: hash_path(path),
            extractor: extractor.to_string(),
        }
    }
}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path_hash.hash(state);
        self.extractor.hash(state);
    }
}

/// Feature cache using moka.
pub struct FeatureCache {
    cache: Cache<CacheKey, ContentFeatures>,
}

impl FeatureCache {
    /// Create a new cache with the given configuration.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl)
    }

    /// Get cached features.
    pub async fn get(&self, key: &CacheKey) -> Option<ContentFeatures> {
        self.cache.get(key).await
    }

    /// Store extracted features.
    pub async fn insert(&self, key: CacheKey, features: ContentFeatures) {
        self.cache.insert(key, features).await;
    }

    /// Clear the cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Get cache statistics.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for FeatureCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

fn hash_path(path: &Path) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use optiq_core::{FeatureSet, FeatureValue};

    fn features() -> ContentFeatures {
        let audio: FeatureSet =
            [("sample_rate".to_string(), FeatureValue::Number(16_000.0))].into_iter().collect();
        ContentFeatures { video: None, audio: Some(audio), text: None }
    }

    #[tokio::test]
    async fn test_cache_operations() {
        let cache = FeatureCache::default();
        let key = CacheKey::new(Path::new("/media/clip.json"), "manifest");

        // Cache miss
        assert!(cache.get(&key).await.is_none());

        // Insert
        cache.insert(key.clone(), features()).await;

        // Cache hit
        let cached = cache.get(&key).await;
        assert_eq!(cached, Some(features()));
    }

    #[tokio::test]
    async fn test_extractors_do_not_share_entries() {
        let cache = FeatureCache::default();
        let path = Path::new("/media/clip.json");

        cache.insert(CacheKey::new(path, "manifest"), features()).await;
        assert!(cache.get(&CacheKey::new(path, "probe")).await.is_none());
    }
}
