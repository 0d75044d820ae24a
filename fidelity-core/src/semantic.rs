// Adapter between the scorer and a vision-language judge

use crate::result::ComparisonResult;
use fidelity_judge::{VisionModel, build_rubric, parse_ratings};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Score reported whenever the judge cannot produce an opinion.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Asks a vision model to rate how similar two screenshots look.
///
/// Every failure mode collapses into a neutral 0.5 with an `error` detail,
/// so a missing or misbehaving judge never sinks a run on its own.
#[derive(Clone, Default)]
pub struct SemanticJudge {
    model: Option<Arc<dyn VisionModel>>,
}

impl SemanticJudge {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model: Some(model) }
    }

    /// A judge with no model behind it. Always reports the neutral score.
    pub fn disabled() -> Self {
        Self { model: None }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    pub async fn judge(&self, source: &[u8], target: &[u8], timeout: Duration) -> ComparisonResult {
        let Some(model) = &self.model else {
            debug!("No semantic judge configured, using neutral score");
            return ComparisonResult::failed(NEUTRAL_SCORE, "semantic judge not configured");
        };

        let prompt = build_rubric();
        let images: [&[u8]; 2] = [source, target];

        let reply = match tokio::time::timeout(timeout, model.complete(&prompt, &images)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Semantic judge failed: {}", e);
                return ComparisonResult::failed(NEUTRAL_SCORE, format!("judge call failed: {}", e));
            }
            Err(_) => {
                warn!("Semantic judge timed out after {:?}", timeout);
                return ComparisonResult::failed(
                    NEUTRAL_SCORE,
                    format!("judge timed out after {} ms", timeout.as_millis()),
                );
            }
        };

        let Some(ratings) = parse_ratings(&reply) else {
            warn!("Semantic judge reply contained no usable ratings");
            return ComparisonResult::failed(NEUTRAL_SCORE, "judge reply contained no ratings")
                .with_detail("raw_response", reply);
        };

        let score = ratings.score();
        info!("Semantic judge score: {:.3}", score);

        let mut result = ComparisonResult::new(score);
        if let Ok(Value::Object(fields)) = serde_json::to_value(&ratings) {
            for (key, value) in fields {
                result = result.with_detail(&key, value);
            }
        }
        result
    }
}

impl fmt::Debug for SemanticJudge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticJudge")
            .field("configured", &self.is_configured())
            .finish()
    }
}
