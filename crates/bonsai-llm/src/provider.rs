//! Provider-side error type shared by the generator clients.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Empty completion in provider response")]
    EmptyCompletion,
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
