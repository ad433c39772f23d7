use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(reqwest::StatusCode),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request cancelled")]
    Cancelled,
}

impl ChatError {
    /// A stop requested by the user, as opposed to a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
