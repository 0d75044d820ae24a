// Runs the five comparisons of one scoring run concurrently

use crate::aggregate::{Aggregator, FidelityReport, SubScores};
use crate::compare::{
    AssetComparator, Comparator, ContentComparator, StructuralComparator, VisualComparator,
};
use crate::config::ScorerConfig;
use crate::error::{ConfigError, ScoreError};
use crate::result::{ComparisonResult, Modality};
use crate::semantic::{NEUTRAL_SCORE, SemanticJudge};
use crate::snapshot::SiteSnapshot;
use futures::future::{self, Either};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info};

pub struct FidelityScorer {
    comparators: Vec<Arc<dyn Comparator>>,
    judge: SemanticJudge,
    judge_timeout: Duration,
    aggregator: Aggregator,
}

impl FidelityScorer {
    /// Validates `config` up front; a scorer that exists can always score.
    pub fn new(config: ScorerConfig, judge: SemanticJudge) -> Result<Self, ConfigError> {
        config.validate()?;

        let comparators: Vec<Arc<dyn Comparator>> = vec![
            Arc::new(VisualComparator::new(&config.visual)),
            Arc::new(StructuralComparator::new()),
            Arc::new(ContentComparator::new()),
            Arc::new(AssetComparator::new()),
        ];

        Ok(Self {
            comparators,
            judge,
            judge_timeout: config.judge_timeout(),
            aggregator: Aggregator::new(config.aggregator)?,
        })
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Score `target` against `source`.
    ///
    /// The four local comparisons run on the blocking pool while the judge
    /// call is in flight. A comparison that panics is reported as a degraded
    /// sub-score instead of failing the run.
    pub async fn score(
        &self,
        source: Arc<SiteSnapshot>,
        target: Arc<SiteSnapshot>,
    ) -> FidelityReport {
        let started = Instant::now();
        let mut tasks: JoinSet<(Modality, ComparisonResult)> = JoinSet::new();

        for comparator in &self.comparators {
            let comparator = Arc::clone(comparator);
            let source = Arc::clone(&source);
            let target = Arc::clone(&target);
            tasks.spawn_blocking(move || {
                let modality = comparator.modality();
                (modality, comparator.compare(&source, &target))
            });
        }

        let judge = self.judge.clone();
        let timeout = self.judge_timeout;
        tasks.spawn(async move {
            let result = judge
                .judge(&source.screenshot, &target.screenshot, timeout)
                .await;
            (Modality::Semantic, result)
        });

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((modality, result)) => {
                    info!("{} comparison scored {:.3}", modality.label(), result.score());
                    results.insert(modality, result);
                }
                Err(e) => error!("Comparison task failed: {}", e),
            }
        }

        let mut take = |modality: Modality| {
            results.remove(&modality).unwrap_or_else(|| {
                ComparisonResult::failed(degraded_score(modality), "comparison task failed")
            })
        };
        let scores = SubScores {
            visual: take(Modality::Visual),
            structural: take(Modality::Structural),
            content: take(Modality::Content),
            asset: take(Modality::Asset),
            semantic: take(Modality::Semantic),
        };

        info!("Scoring run finished in {:.2?}", started.elapsed());
        self.aggregator.aggregate(scores)
    }

    /// Like [`score`](Self::score), but gives up as soon as `cancel`
    /// resolves.
    ///
    /// In-flight judge calls are aborted. Local comparisons already running
    /// on the blocking pool finish in the background and their results are
    /// discarded.
    pub async fn score_until<C>(
        &self,
        source: Arc<SiteSnapshot>,
        target: Arc<SiteSnapshot>,
        cancel: C,
    ) -> Result<FidelityReport, ScoreError>
    where
        C: Future<Output = ()>,
    {
        let run = std::pin::pin!(self.score(source, target));
        let cancel = std::pin::pin!(cancel);

        match future::select(cancel, run).await {
            Either::Left(((), _)) => {
                info!("Scoring run cancelled");
                Err(ScoreError::Cancelled)
            }
            Either::Right((report, _)) => Ok(report),
        }
    }
}

fn degraded_score(modality: Modality) -> f64 {
    match modality {
        Modality::Semantic => NEUTRAL_SCORE,
        _ => 0.0,
    }
}
