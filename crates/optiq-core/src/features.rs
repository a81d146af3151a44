//! Feature sets: immutable snapshots of extracted content metrics.
//!
//! The extraction collaborator returns metadata already computed
//! (resolution, bitrate, fps for video; sample rate, channels for audio;
//! word counts and keyword metrics for text). This module only models
//! that data; it never decodes media.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Modality;

/// Errors loading a feature manifest.
#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

lazy_static! {
    /// Bitrate strings as they appear in encoder configs: "4500k",
    /// "1.5M", "800kbps", or a bare number of bits per second.
    static ref BITRATE_PATTERN: Regex =
        Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*([kKmMgG]?)(?:bps)?\s*$").unwrap();
}

/// Parse a bitrate string to bits per second.
///
/// Returns `None` when the string is not bitrate-shaped.
pub fn parse_bitrate(raw: &str) -> Option<f64> {
    let caps = BITRATE_PATTERN.captures(raw)?;
    let value: f64 = caps[1].parse().ok()?;
    let multiplier = match &caps[2] {
        "k" | "K" => 1_000.0,
        "m" | "M" => 1_000_000.0,
        "g" | "G" => 1_000_000_000.0,
        _ => 1.0,
    };
    Some(value * multiplier)
}

/// A single raw feature value from the extraction collaborator.
///
/// Closed variant: the configuration schema fixes the value shapes, so
/// this is not an open plugin surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Plain numeric metric (fps, sample rate, word count, density).
    Number(f64),

    /// Width and height in pixels.
    Dimensions(u32, u32),

    /// Categorical value (codec, container format) or a bitrate string.
    Text(String),
}

impl FeatureValue {
    /// Collapse the value to a comparable magnitude for ratio-style
    /// normalization. Dimensions compare by pixel area; text compares
    /// as a bitrate when it parses as one.
    pub fn magnitude(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) if n.is_finite() => Some(*n),
            FeatureValue::Number(_) => None,
            FeatureValue::Dimensions(w, h) => Some(f64::from(*w) * f64::from(*h)),
            FeatureValue::Text(s) => parse_bitrate(s),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Number(n) => write!(f, "{n}"),
            FeatureValue::Dimensions(w, h) => write!(f, "{w}x{h}"),
            FeatureValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Mapping from feature name to raw value, scoped to one modality and
/// one content instance.
///
/// Treated as an immutable snapshot: the Applying state produces a new
/// `FeatureSet` via [`FeatureSet::with`] instead of mutating in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeMap<String, FeatureValue>);

impl FeatureSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureValue> {
        self.0.get(feature)
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.0.contains_key(feature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureValue)> {
        self.0.iter()
    }

    /// Produce a new snapshot with one feature replaced or added.
    pub fn with(&self, feature: impl Into<String>, value: FeatureValue) -> Self {
        let mut next = self.0.clone();
        next.insert(feature.into(), value);
        Self(next)
    }
}

impl FromIterator<(String, FeatureValue)> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-modality feature sets for one content instance.
///
/// A `None` modality models content without that track (audio-only
/// files have no video features); the overall scorer renormalizes
/// weights over the tracks that exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<FeatureSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<FeatureSet>,

    /// Text features feed both the SEO and GEO tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<FeatureSet>,
}

impl ContentFeatures {
    /// Load a feature manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, FeatureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a feature manifest from a JSON file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self, FeatureError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Feature set backing a modality. SEO and GEO both read the text
    /// track.
    pub fn modality(&self, modality: Modality) -> Option<&FeatureSet> {
        match modality {
            Modality::Video => self.video.as_ref(),
            Modality::Audio => self.audio.as_ref(),
            Modality::Seo | Modality::Geo => self.text.as_ref(),
        }
    }

    /// Produce a new snapshot with one modality's feature set replaced.
    pub fn with_modality(&self, modality: Modality, features: FeatureSet) -> Self {
        let mut next = self.clone();
        match modality {
            Modality::Video => next.video = Some(features),
            Modality::Audio => next.audio = Some(features),
            Modality::Seo | Modality::Geo => next.text = Some(features),
        }
        next
    }
}
