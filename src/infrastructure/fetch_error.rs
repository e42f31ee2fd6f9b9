//! Fetch failure types
//!
//! Every way a single product page lookup can go wrong. These never escape
//! the category fetcher as errors; they are carried inside
//! `Resolution::Missing` so callers can log why the sentinel was used.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("HTTP request failed: {status} - {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("URL resolution failed: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Breadcrumb trail not found in page")]
    MissingBreadcrumb,
}

impl FetchFailure {
    /// Network-level failure, as opposed to a page without a category
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::HttpStatus { .. } | Self::Transport { .. } | Self::Body { .. }
        )
    }

    pub(crate) fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}
