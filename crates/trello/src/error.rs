use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrelloError {
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// Non-success status; `body` is the remote response text, unmodified.
    #[error("{body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("failed to deserialize card payload: {0}")]
    Deserialize(#[from] serde_json::Error),
}
