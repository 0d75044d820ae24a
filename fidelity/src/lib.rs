// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    FidelityConfig, ScoreOverrides, apply_overrides, build_judge, exit_code, load_config,
    load_snapshot,
};
