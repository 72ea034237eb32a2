use thiserror::Error;

/// Errors raised while fetching or decoding a CONTENTdm page.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Embedded state error: {0}")]
    EmbeddedState(String),

    #[error("Not an item page: {0}")]
    NotAnItem(String),
}

impl ScrapeError {
    /// Rate limiting and transient server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::Status { status, .. } if *status == 429 || (500..=504).contains(status)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
