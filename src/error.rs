//! Error type shared by source adapters, the classifier and the report sinks.
//!
//! Every variant is `Send + Sync` so errors can cross `async-trait` futures.
//! Most of these never reach `main`: source adapters swallow them after logging
//! and the classifier turns them into retries and, eventually, a fallback.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unexpected classification response: {0}")]
    Schema(String),

    #[error("Page rendering failed: {0}")]
    Render(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NewsError>;
