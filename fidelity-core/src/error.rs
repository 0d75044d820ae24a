use thiserror::Error;

/// A snapshot that breaks the tree shape contract. This is an upstream
/// programming error and is never scored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSnapshotError {
    #[error("page {page}: node id '{id}' appears more than once")]
    DuplicateNodeId { page: usize, id: String },

    #[error("page {page}: node '{id}' names unknown parent '{parent}'")]
    UnknownParent {
        page: usize,
        id: String,
        parent: String,
    },

    #[error("page {page}: node '{id}' is part of a parent cycle")]
    ParentCycle { page: usize, id: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("weight '{name}' must be a finite value in [0, 1], got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },

    #[error("threshold '{name}' is invalid: {reason}")]
    InvalidThreshold { name: &'static str, reason: String },

    #[error("canvas width must be greater than zero")]
    ZeroCanvasWidth,

    #[error("judge timeout must be greater than zero")]
    ZeroJudgeTimeout,
}

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("scoring run was cancelled")]
    Cancelled,
}
