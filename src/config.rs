use crate::error::SearchError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Linear combination weights for the final score.
///
/// A weight of 0 disables the corresponding term. Missing fields in a
/// weights file fall back to the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub title: f64,
    pub description: f64,
    pub features: f64,
    pub proximity: f64,
    pub avg_mark: f64,
    pub count_mark: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            title: 3.0,
            description: 1.5,
            features: 0.8,
            proximity: 2.0,
            avg_mark: 0.4,
            count_mark: 0.2,
        }
    }
}

impl Weights {
    /// Every weight set to 0
    pub fn zero() -> Self {
        Self {
            title: 0.0,
            description: 0.0,
            features: 0.0,
            proximity: 0.0,
            avg_mark: 0.0,
            count_mark: 0.0,
        }
    }

    /// Load weights from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read weights file {}", path.display()))?;
        let weights = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse weights file {}", path.display()))?;
        Ok(weights)
    }
}

/// BM25 parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f64,
    /// Length normalization
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Free-text fields with a positional index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextField {
    Title,
    Description,
}

impl TextField {
    pub const ALL: [TextField; 2] = [TextField::Title, TextField::Description];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextField::Title => "title",
            TextField::Description => "description",
        }
    }
}

impl FromStr for TextField {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(TextField::Title),
            "description" => Ok(TextField::Description),
            other => Err(SearchError::InvalidField(other.to_string())),
        }
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical product features with a feature index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Brand,
    Origin,
    Colors,
    Flavors,
}

/// Logical feature name -> key used in a document's `product_features`
pub const FEATURE_KEYS: [(Feature, &str); 4] = [
    (Feature::Brand, "brand"),
    (Feature::Origin, "made in"),
    (Feature::Colors, "colors"),
    (Feature::Flavors, "flavors"),
];

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Brand,
        Feature::Origin,
        Feature::Colors,
        Feature::Flavors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Brand => "brand",
            Feature::Origin => "origin",
            Feature::Colors => "colors",
            Feature::Flavors => "flavors",
        }
    }

    pub fn physical_key(&self) -> &'static str {
        FEATURE_KEYS
            .iter()
            .find(|(feature, _)| feature == self)
            .map(|(_, key)| *key)
            .unwrap_or_else(|| self.as_str())
    }
}

impl FromStr for Feature {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| SearchError::InvalidFeature(s.to_string()))
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
