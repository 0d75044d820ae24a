pub mod asset;
pub mod content;
pub mod structural;
pub mod visual;

pub use asset::AssetComparator;
pub use content::ContentComparator;
pub use structural::StructuralComparator;
pub use visual::VisualComparator;

use crate::result::{ComparisonResult, Modality};
use crate::snapshot::SiteSnapshot;

/// A pure comparison of one modality between a source and a target snapshot.
///
/// Implementations never fail: problems with the inputs are reported as a
/// degraded score with an `error` detail.
pub trait Comparator: Send + Sync {
    fn modality(&self) -> Modality;

    fn compare(&self, source: &SiteSnapshot, target: &SiteSnapshot) -> ComparisonResult;
}

/// `min(a, b) / max(a, b)`, or `when_both_zero` if there is nothing to count.
pub(crate) fn count_ratio(a: usize, b: usize, when_both_zero: f64) -> f64 {
    let max = a.max(b);
    if max == 0 {
        when_both_zero
    } else {
        a.min(b) as f64 / max as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_ratio() {
        assert_eq!(count_ratio(5, 10, 0.0), 0.5);
        assert_eq!(count_ratio(10, 5, 0.0), 0.5);
        assert_eq!(count_ratio(0, 7, 1.0), 0.0);
        assert_eq!(count_ratio(0, 0, 1.0), 1.0);
        assert_eq!(count_ratio(0, 0, 0.0), 0.0);
    }
}
