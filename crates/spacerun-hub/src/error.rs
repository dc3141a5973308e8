//! Error types for registry and endpoint API calls.

use thiserror::Error;

/// Result type for hub operations.
pub type HubResult<T> = std::result::Result<T, HubError>;

/// Errors returned by a [`crate::HubApi`] implementation.
#[derive(Debug, Error)]
pub enum HubError {
    /// The request never produced a response.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The provider answered with a non-success status. `body` is kept verbatim.
    #[error("hub returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// A repository with this identifier already exists.
    #[error("repository already exists: {0}")]
    Conflict(String),

    /// The provider answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HubError {
    /// Raw provider response body, when there is one.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
