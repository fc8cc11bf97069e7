use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or upstream-service failure. Always safe to retry.
    #[error("Fetch from {target} failed: {reason}")]
    TransientFetch { target: String, reason: String },

    /// A single record that could not be interpreted; callers skip it.
    #[error("Malformed record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DeskError {
    /// Build a [`DeskError::TransientFetch`] for the given upstream target.
    pub fn transient(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::TransientFetch {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller may retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientFetch { .. } | Self::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
