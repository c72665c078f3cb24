//! Error type for hub requests.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hub operations
pub type Result<T> = std::result::Result<T, HubError>;

/// Errors from fetching or materializing a remote skill.
///
/// Every variant is a fetch failure from the caller's point of view.
#[derive(Error, Debug)]
pub enum HubError {
    /// The hub has no skill with this id
    #[error("skill '{id}' not found on the hub")]
    NotFound {
        /// Requested id
        id: String,
    },

    /// Non-success status other than 404
    #[error("hub returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the body, or the raw body
        message: String,
    },

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The request did not complete in time
    #[error("request to {url} timed out")]
    Timeout {
        /// Requested URL
        url: String,
    },

    /// Response body is not a skill document
    #[error("malformed hub response: {0}")]
    Json(#[from] serde_json::Error),

    /// A file path would land outside the package directory
    #[error("unsafe path in remote skill: {0}")]
    UnsafePath(String),

    /// A base64 file body could not be decoded
    #[error("invalid base64 content for {0}")]
    Decode(String),

    /// Skill id cannot be used as a URL path segment
    #[error("invalid skill id '{0}'")]
    InvalidId(String),

    /// Base URL could not be parsed or cannot carry a path
    #[error("invalid hub URL: {0}")]
    InvalidUrl(String),

    /// Writing the materialized package failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl HubError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether another attempt might succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
