use super::{Comparator, count_ratio};
use crate::model::AssetKind;
use crate::result::{ComparisonResult, Modality};
use crate::snapshot::SiteSnapshot;
use std::collections::HashSet;
use tracing::debug;

const COUNT_WEIGHT: f64 = 0.5;
const COVERAGE_WEIGHT: f64 = 0.5;

/// Compares the media inventories of both sides by kind only.
///
/// Coverage is measured from the source towards the target, so this
/// comparator is not symmetric: a target that drops every asset kind scores
/// lower than a target that adds kinds the source never had.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetComparator;

impl AssetComparator {
    pub fn new() -> Self {
        Self
    }
}

impl Comparator for AssetComparator {
    fn modality(&self) -> Modality {
        Modality::Asset
    }

    fn compare(&self, source: &SiteSnapshot, target: &SiteSnapshot) -> ComparisonResult {
        let source_kinds: Vec<AssetKind> = source.assets().map(|a| a.kind).collect();
        let target_kinds: HashSet<AssetKind> = target.assets().map(|a| a.kind).collect();
        let target_count = target.assets().count();

        let covered = source_kinds
            .iter()
            .filter(|kind| target_kinds.contains(*kind))
            .count();

        // Two empty inventories give 0 for both signals.
        let count_similarity = count_ratio(source_kinds.len(), target_count, 0.0);
        let type_similarity = covered as f64 / source_kinds.len().max(1) as f64;

        let score = COUNT_WEIGHT * count_similarity + COVERAGE_WEIGHT * type_similarity;

        debug!(
            "Asset: count {:.3}, coverage {:.3} ({} vs {} assets)",
            count_similarity,
            type_similarity,
            source_kinds.len(),
            target_count
        );

        ComparisonResult::new(score)
            .with_detail("count_similarity", count_similarity)
            .with_detail("type_similarity", type_similarity)
            .with_detail("source_asset_count", source_kinds.len())
            .with_detail("target_asset_count", target_count)
    }
}
