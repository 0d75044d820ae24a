use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The five signals a fidelity report is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Visual,
    Structural,
    Content,
    Asset,
    Semantic,
}

impl Modality {
    pub const ALL: [Modality; 5] = [
        Modality::Visual,
        Modality::Structural,
        Modality::Content,
        Modality::Asset,
        Modality::Semantic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Visual => "visual",
            Modality::Structural => "structural",
            Modality::Content => "content",
            Modality::Asset => "asset",
            Modality::Semantic => "semantic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Modality::Visual => "Visual",
            Modality::Structural => "Structural",
            Modality::Content => "Content",
            Modality::Asset => "Asset",
            Modality::Semantic => "Semantic",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-score of one modality plus the raw metrics behind it.
///
/// The score is clamped into [0,1] on construction (NaN becomes 0.0).
/// Details are attached while the result is being built; once handed to the
/// aggregator it is only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    score: f64,
    #[serde(default)]
    details: BTreeMap<String, Value>,
}

impl ComparisonResult {
    pub fn new(score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            score,
            details: BTreeMap::new(),
        }
    }

    /// A degraded result carrying an `error` detail.
    pub fn failed(score: f64, error: impl fmt::Display) -> Self {
        Self::new(score).with_detail("error", error.to_string())
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn details(&self) -> &BTreeMap<String, Value> {
        &self.details
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(Value::as_f64)
    }

    pub fn error(&self) -> Option<&str> {
        self.details.get("error").and_then(Value::as_str)
    }
}
