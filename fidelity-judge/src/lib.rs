pub mod client;
pub mod error;
pub mod prompt;
pub mod ratings;

pub use client::{ChatCompletionsModel, JudgeConfig, VisionModel};
pub use error::JudgeError;
pub use prompt::{RATING_KEYS, build_rubric};
pub use ratings::{JudgeRatings, extract_json_object, parse_ratings};
