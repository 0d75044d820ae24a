pub mod aggregate;
pub mod compare;
pub mod config;
pub mod error;
pub mod model;
pub mod report;
pub mod result;
pub mod scorer;
pub mod semantic;
pub mod snapshot;

pub use aggregate::{Aggregator, FidelityReport, SubScores};
pub use config::{AggregatorConfig, ScorerConfig, ScoringWeights, VisualConfig};
pub use error::{ConfigError, InvalidSnapshotError, ScoreError};
pub use model::{AssetKind, AssetRef, Node, NodeKind};
pub use result::{ComparisonResult, Modality};
pub use scorer::FidelityScorer;
pub use semantic::SemanticJudge;
pub use snapshot::{Page, SiteSnapshot, SnapshotDocument};
