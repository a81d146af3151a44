//! Feature extraction collaborators.
//!
//! Extraction is the only I/O the runtime performs on content. The
//! engine never decodes media itself; an extractor turns a path into
//! the feature manifest the scorer consumes. `ManifestExtractor` reads
//! sidecar JSON manifests, which is also the shape batch tests mock.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use optiq_core::ContentFeatures;

/// Errors from feature extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error reading '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest '{path}': {reason}")]
    Malformed { path: String, reason: String },

    #[error("Unsupported content: {0}")]
    Unsupported(String),
}

/// Turns a content path into extracted features.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<ContentFeatures, ExtractError>;

    /// Extractor name for logs.
    fn name(&self) -> &str;
}

/// Reads pre-extracted features from a JSON manifest file.
#[derive(Debug, Default)]
pub struct ManifestExtractor;

impl ManifestExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FeatureExtractor for ManifestExtractor {
    async fn extract(&self, path: &Path) -> Result<ContentFeatures, ExtractError> {
        let path_text = path.display().to_string();
        let raw = tokio::fs::read_to_string(path).await.map_err(|source| {
            ExtractError::IoError { path: path_text.clone(), source }
        })?;

        let features = parse_manifest(&raw).map_err(|reason| ExtractError::Malformed {
            path: path_text.clone(),
            reason,
        })?;

        tracing::debug!(path = %path_text, "Extracted features from manifest");
        Ok(features)
    }

    fn name(&self) -> &str {
        "manifest"
    }
}

/// Parse a manifest body, rejecting manifests with no tracks at all.
fn parse_manifest(raw: &str) -> Result<ContentFeatures, String> {
    let features = ContentFeatures::from_json(raw).map_err(|e| e.to_string())?;
    if features.video.is_none() && features.audio.is_none() && features.text.is_none() {
        return Err("manifest declares no video, audio, or text track".to_string());
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use optiq_core::FeatureValue;

    #[test]
    fn test_parse_manifest() {
        let raw = r#"{
            "video": {"resolution": [1920, 1080], "frame_rate": 30},
            "audio": {"sample_rate": 16000, "channels": 1}
        }"#;

        let features = parse_manifest(raw).unwrap();
        let video = features.video.as_ref().unwrap();
        assert_eq!(video.get("resolution"), Some(&FeatureValue::Dimensions(1920, 1080)));
        let audio = features.audio.as_ref().unwrap();
        assert_eq!(audio.get("sample_rate"), Some(&FeatureValue::Number(16_000.0)));
    }

    #[test]
    fn test_parse_manifest_rejects_empty() {
        assert!(parse_manifest("{}").is_err());
        assert!(parse_manifest("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let extractor = ManifestExtractor::new();
        let result = extractor.extract(Path::new("/nonexistent/clip.json")).await;
        assert!(matches!(result, Err(ExtractError::IoError { .. })));
    }
}
