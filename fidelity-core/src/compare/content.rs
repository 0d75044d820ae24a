use super::{Comparator, count_ratio};
use crate::result::{ComparisonResult, Modality};
use crate::snapshot::SiteSnapshot;
use similar::{Algorithm, TextDiff};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SEQUENCE_WEIGHT: f64 = 0.7;
const LENGTH_WEIGHT: f64 = 0.3;

/// Budget for the character diff of one comparison.
pub const DEFAULT_DIFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Compares the text carried by both sides, ignoring where in the tree it
/// lives.
///
/// The character diff is quadratic on dissimilar text, so it runs against a
/// deadline. Past the deadline the unexplored remainder counts as unmatched
/// and `text_similarity` becomes a lower bound; the result then carries
/// `text_similarity_approximate: true`.
#[derive(Debug, Clone, Copy)]
pub struct ContentComparator {
    diff_timeout: Duration,
}

impl Default for ContentComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentComparator {
    pub fn new() -> Self {
        Self {
            diff_timeout: DEFAULT_DIFF_TIMEOUT,
        }
    }

    pub fn with_diff_timeout(mut self, timeout: Duration) -> Self {
        self.diff_timeout = timeout;
        self
    }

    pub fn diff_timeout(&self) -> Duration {
        self.diff_timeout
    }
}

impl Comparator for ContentComparator {
    fn modality(&self) -> Modality {
        Modality::Content
    }

    fn compare(&self, source: &SiteSnapshot, target: &SiteSnapshot) -> ComparisonResult {
        let source_texts: Vec<&str> = source.texts().collect();
        let target_texts: Vec<&str> = target.texts().collect();

        let source_joined = source_texts.join(" ");
        let target_joined = target_texts.join(" ");

        // 2 * matches / total length; two empty strings are identical.
        let started = Instant::now();
        let text_similarity = TextDiff::configure()
            .algorithm(Algorithm::Myers)
            .timeout(self.diff_timeout)
            .diff_chars(source_joined.as_str(), target_joined.as_str())
            .ratio() as f64;
        let approximate = started.elapsed() >= self.diff_timeout;
        if approximate {
            warn!(
                "Content diff hit its {:?} deadline; text similarity is a lower bound",
                self.diff_timeout
            );
        }

        let source_length: usize = source_texts.iter().map(|t| t.chars().count()).sum();
        let target_length: usize = target_texts.iter().map(|t| t.chars().count()).sum();
        let length_similarity = count_ratio(source_length, target_length, 1.0);

        let score = SEQUENCE_WEIGHT * text_similarity + LENGTH_WEIGHT * length_similarity;

        debug!(
            "Content: sequence {:.3}, length {:.3} ({} vs {} chars)",
            text_similarity, length_similarity, source_length, target_length
        );

        ComparisonResult::new(score)
            .with_detail("text_similarity", text_similarity)
            .with_detail("text_similarity_approximate", approximate)
            .with_detail("length_similarity", length_similarity)
            .with_detail("source_text_length", source_length)
            .with_detail("target_text_length", target_length)
            .with_detail("source_text_blocks", source_texts.len())
            .with_detail("target_text_blocks", target_texts.len())
    }
}
