use thiserror::Error;

/// Failure to determine the current tag name
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Release feed contains no entries")]
    EmptyFeed,
}
