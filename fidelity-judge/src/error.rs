use thiserror::Error;

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Model returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Model reply contained no message content")]
    EmptyResponse,

    #[error("Encoding error: {0}")]
    EncodeError(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, JudgeError>;
