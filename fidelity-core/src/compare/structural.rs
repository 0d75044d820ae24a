// Tree-shape comparison by aggregate statistics only

use super::{Comparator, count_ratio};
use crate::model::NodeKind;
use crate::result::{ComparisonResult, Modality};
use crate::snapshot::SiteSnapshot;
use std::collections::BTreeMap;
use tracing::debug;

const PAGE_WEIGHT: f64 = 0.2;
const ELEMENT_WEIGHT: f64 = 0.4;
const TYPE_WEIGHT: f64 = 0.4;

/// Compares page counts, per-page element counts and the distribution of
/// node kinds.
///
/// Pages are paired by index. A target that reorders pages is scored as if
/// the pages were different, which is a known accuracy limitation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralComparator;

impl StructuralComparator {
    pub fn new() -> Self {
        Self
    }
}

impl Comparator for StructuralComparator {
    fn modality(&self) -> Modality {
        Modality::Structural
    }

    fn compare(&self, source: &SiteSnapshot, target: &SiteSnapshot) -> ComparisonResult {
        let page_similarity = count_ratio(source.pages.len(), target.pages.len(), 1.0);

        let page_ratios: Vec<f64> = source
            .pages
            .iter()
            .zip(&target.pages)
            .map(|(s, t)| count_ratio(s.element_count(), t.element_count(), 1.0))
            .collect();
        let element_similarity = if page_ratios.is_empty() {
            0.0
        } else {
            page_ratios.iter().sum::<f64>() / page_ratios.len() as f64
        };

        let source_kinds = kind_counts(source);
        let target_kinds = kind_counts(target);
        let type_similarity = cosine_similarity(&source_kinds, &target_kinds);

        let score = PAGE_WEIGHT * page_similarity
            + ELEMENT_WEIGHT * element_similarity
            + TYPE_WEIGHT * type_similarity;

        debug!(
            "Structural: pages {:.3}, elements {:.3}, types {:.3}",
            page_similarity, element_similarity, type_similarity
        );

        ComparisonResult::new(score)
            .with_detail("page_count_similarity", page_similarity)
            .with_detail("element_count_similarity", element_similarity)
            .with_detail("element_type_similarity", type_similarity)
            .with_detail("source_pages", source.pages.len())
            .with_detail("target_pages", target.pages.len())
            .with_detail("pages_compared", page_ratios.len())
            .with_detail("source_elements", source_kinds.values().sum::<usize>())
            .with_detail("target_elements", target_kinds.values().sum::<usize>())
    }
}

fn kind_counts(snapshot: &SiteSnapshot) -> BTreeMap<NodeKind, usize> {
    let mut counts = BTreeMap::new();
    for node in snapshot.nodes() {
        *counts.entry(node.kind).or_insert(0) += 1;
    }
    counts
}

/// Cosine similarity of two kind-frequency vectors over the union of kinds.
/// 1.0 when neither side has any node, 0.0 when only one side is empty.
fn cosine_similarity(a: &BTreeMap<NodeKind, usize>, b: &BTreeMap<NodeKind, usize>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let dot: f64 = a
        .iter()
        .filter_map(|(kind, count)| b.get(kind).map(|other| (*count * *other) as f64))
        .sum();
    let magnitude_a = a.values().map(|c| (*c as f64).powi(2)).sum::<f64>().sqrt();
    let magnitude_b = b.values().map(|c| (*c as f64).powi(2)).sum::<f64>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    (dot / (magnitude_a * magnitude_b)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(NodeKind, usize)]) -> BTreeMap<NodeKind, usize> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_cosine_identical_distributions() {
        let a = counts(&[(NodeKind::Heading, 2), (NodeKind::Paragraph, 5)]);
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_scaled_distribution_is_identical() {
        let a = counts(&[(NodeKind::Heading, 1), (NodeKind::Image, 2)]);
        let b = counts(&[(NodeKind::Heading, 3), (NodeKind::Image, 6)]);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_disjoint_kinds() {
        let a = counts(&[(NodeKind::Heading, 4)]);
        let b = counts(&[(NodeKind::Button, 4)]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_empty_cases() {
        let empty = BTreeMap::new();
        let a = counts(&[(NodeKind::Heading, 1)]);
        assert_eq!(cosine_similarity(&empty, &empty), 1.0);
        assert_eq!(cosine_similarity(&a, &empty), 0.0);
        assert_eq!(cosine_similarity(&empty, &a), 0.0);
    }
}
