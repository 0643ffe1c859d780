use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API rate limited (HTTP 429)")]
    RateLimited,

    #[error("generation API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid generated review: {0}")]
    InvalidReview(String),
}
