// Weighted combination of the five sub-scores into one report

use crate::config::AggregatorConfig;
use crate::error::ConfigError;
use crate::result::{ComparisonResult, Modality};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

pub const TARGET_MET: &str = "Excellent migration! Target similarity achieved.";
pub const IMPROVEMENTS_NEEDED: &str = "Good migration, but some improvements needed.";
pub const REVIEW_REQUIRED: &str = "Significant differences detected. Manual review required.";

/// Outcome of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityReport {
    overall_score: f64,
    meets_target: bool,
    target_threshold: f64,
    sub_scores: BTreeMap<Modality, ComparisonResult>,
    recommendations: Vec<String>,
}

impl FidelityReport {
    pub fn overall_score(&self) -> f64 {
        self.overall_score
    }

    pub fn meets_target(&self) -> bool {
        self.meets_target
    }

    pub fn target_threshold(&self) -> f64 {
        self.target_threshold
    }

    /// Sub-scores keyed by modality, iterated in report order.
    pub fn sub_scores(&self) -> &BTreeMap<Modality, ComparisonResult> {
        &self.sub_scores
    }

    pub fn sub_score(&self, modality: Modality) -> Option<&ComparisonResult> {
        self.sub_scores.get(&modality)
    }

    /// Headline first, then one line per weak modality.
    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }
}

/// The five per-modality results of one run.
#[derive(Debug, Clone)]
pub struct SubScores {
    pub visual: ComparisonResult,
    pub structural: ComparisonResult,
    pub content: ComparisonResult,
    pub asset: ComparisonResult,
    pub semantic: ComparisonResult,
}

impl SubScores {
    pub fn get(&self, modality: Modality) -> &ComparisonResult {
        match modality {
            Modality::Visual => &self.visual,
            Modality::Structural => &self.structural,
            Modality::Content => &self.content,
            Modality::Asset => &self.asset,
            Modality::Semantic => &self.semantic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn aggregate(&self, scores: SubScores) -> FidelityReport {
        let weights = &self.config.weights;
        let overall: f64 = Modality::ALL
            .iter()
            .map(|m| weights.weight(*m) * scores.get(*m).score())
            .sum();
        let overall_score = overall.clamp(0.0, 1.0);
        let meets_target = overall_score >= self.config.target_threshold;

        let recommendations = self.recommend(overall_score, &scores);

        info!(
            "Overall fidelity {:.2}% (target {:.2}%)",
            overall_score * 100.0,
            self.config.target_threshold * 100.0
        );

        let SubScores {
            visual,
            structural,
            content,
            asset,
            semantic,
        } = scores;
        let sub_scores = BTreeMap::from([
            (Modality::Visual, visual),
            (Modality::Structural, structural),
            (Modality::Content, content),
            (Modality::Asset, asset),
            (Modality::Semantic, semantic),
        ]);

        FidelityReport {
            overall_score,
            meets_target,
            target_threshold: self.config.target_threshold,
            sub_scores,
            recommendations,
        }
    }

    fn recommend(&self, overall: f64, scores: &SubScores) -> Vec<String> {
        let headline = if overall >= self.config.target_threshold {
            TARGET_MET
        } else if overall >= self.config.review_threshold {
            IMPROVEMENTS_NEEDED
        } else {
            REVIEW_REQUIRED
        };

        let mut lines = vec![headline.to_string()];
        for modality in Modality::ALL {
            let score = scores.get(modality).score();
            if score < self.config.modality_floor {
                lines.push(format!(
                    "• {}: Score {:.2}% - Needs improvement",
                    modality.label(),
                    score * 100.0
                ));
            }
        }
        lines
    }
}
