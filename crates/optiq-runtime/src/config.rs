//! Runtime configuration.
//!
//! Durations are written as humantime strings ("30s", "5m") so config
//! files stay readable.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Configuration for the extraction and batch runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Per-file budget for feature extraction.
    #[serde(with = "humantime_duration")]
    pub extraction_timeout: Duration,

    /// Maximum concurrent optimization runs in a batch.
    pub max_concurrency: usize,

    /// Feature cache settings.
    pub cache: CacheConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            extraction_timeout: Duration::from_secs(30),
            max_concurrency: 4,
            cache: CacheConfig::default(),
        }
    }
}

/// Feature cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached feature sets.
    pub max_entries: u64,

    /// How long an extracted feature set stays valid.
    #[serde(with = "humantime_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            ttl: Duration::from_secs(3600),
        }
    }
}

mod humantime_duration {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.extraction_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.cache.max_entries, 1024);
    }

    #[test]
    fn test_humantime_roundtrip() {
        let json = r#"{"extraction_timeout": "45s", "max_concurrency": 8, "cache": {"ttl": "5m"}}"#;
        let config: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extraction_timeout, Duration::from_secs(45));
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert_eq!(config.cache.max_entries, 1024);

        let back = serde_json::to_string(&config).unwrap();
        assert!(back.contains("45s"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_concurrency, 4);
    }
}
