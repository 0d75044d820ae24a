// Scoring configuration, validated before any run starts

use crate::error::ConfigError;
use crate::result::Modality;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest accepted distance between the weight sum and 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Per-modality weights of the overall score. Always sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightsDocument", into = "WeightsDocument")]
pub struct ScoringWeights {
    visual: f64,
    structural: f64,
    content: f64,
    asset: f64,
    semantic: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WeightsDocument {
    visual: f64,
    structural: f64,
    content: f64,
    asset: f64,
    semantic: f64,
}

impl ScoringWeights {
    pub fn new(
        visual: f64,
        structural: f64,
        content: f64,
        asset: f64,
        semantic: f64,
    ) -> Result<Self, ConfigError> {
        let weights = Self {
            visual,
            structural,
            content,
            asset,
            semantic,
        };
        weights.check_each()?;

        let sum = weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }
        Ok(weights)
    }

    /// Scale arbitrary non-negative weights so that they sum to 1.0.
    pub fn normalized(
        visual: f64,
        structural: f64,
        content: f64,
        asset: f64,
        semantic: f64,
    ) -> Result<Self, ConfigError> {
        let raw = Self {
            visual,
            structural,
            content,
            asset,
            semantic,
        };
        for modality in Modality::ALL {
            let value = raw.weight(modality);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: modality.as_str(),
                    value,
                });
            }
        }

        let sum = raw.sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Err(ConfigError::WeightSum { sum });
        }
        Self::new(
            visual / sum,
            structural / sum,
            content / sum,
            asset / sum,
            semantic / sum,
        )
    }

    pub fn weight(&self, modality: Modality) -> f64 {
        match modality {
            Modality::Visual => self.visual,
            Modality::Structural => self.structural,
            Modality::Content => self.content,
            Modality::Asset => self.asset,
            Modality::Semantic => self.semantic,
        }
    }

    pub fn sum(&self) -> f64 {
        Modality::ALL.iter().map(|m| self.weight(*m)).sum()
    }

    fn check_each(&self) -> Result<(), ConfigError> {
        for modality in Modality::ALL {
            let value = self.weight(modality);
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidWeight {
                    name: modality.as_str(),
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            visual: 0.35,
            structural: 0.20,
            content: 0.20,
            asset: 0.10,
            semantic: 0.15,
        }
    }
}

impl TryFrom<WeightsDocument> for ScoringWeights {
    type Error = ConfigError;

    fn try_from(doc: WeightsDocument) -> Result<Self, Self::Error> {
        Self::new(doc.visual, doc.structural, doc.content, doc.asset, doc.semantic)
    }
}

impl From<ScoringWeights> for WeightsDocument {
    fn from(weights: ScoringWeights) -> Self {
        Self {
            visual: weights.visual,
            structural: weights.structural,
            content: weights.content,
            asset: weights.asset,
            semantic: weights.semantic,
        }
    }
}

/// Weights plus the thresholds that drive classification and recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub weights: ScoringWeights,
    /// Overall score at or above which the migration meets its target.
    pub target_threshold: f64,
    /// Overall score below which manual review is required.
    pub review_threshold: f64,
    /// Sub-scores below this get their own recommendation line.
    pub modality_floor: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            target_threshold: 0.90,
            review_threshold: 0.80,
            modality_floor: 0.70,
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("target_threshold", self.target_threshold),
            ("review_threshold", self.review_threshold),
            ("modality_floor", self.modality_floor),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold {
                    name,
                    reason: format!("{} is outside [0, 1]", value),
                });
            }
        }

        if self.review_threshold > self.target_threshold {
            return Err(ConfigError::InvalidThreshold {
                name: "review_threshold",
                reason: format!(
                    "{} is above target_threshold {}",
                    self.review_threshold, self.target_threshold
                ),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Width both screenshots are resampled to before pixel comparison.
    pub canvas_width: u32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self { canvas_width: 1920 }
    }
}

/// Everything a scoring run needs besides its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub aggregator: AggregatorConfig,
    pub visual: VisualConfig,
    /// Upper bound on the semantic judge call.
    pub judge_timeout_ms: u64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            visual: VisualConfig::default(),
            judge_timeout_ms: 60_000,
        }
    }
}

impl ScorerConfig {
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_millis(self.judge_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.aggregator.validate()?;
        if self.visual.canvas_width == 0 {
            return Err(ConfigError::ZeroCanvasWidth);
        }
        if self.judge_timeout_ms == 0 {
            return Err(ConfigError::ZeroJudgeTimeout);
        }
        Ok(())
    }
}
