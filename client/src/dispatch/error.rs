use std::time::Duration;
use thiserror::Error;

/// Transport-level failures. A timeout is one kind of network failure.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No response within the configured per-request timeout
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// Connection, TLS or body transfer failed
    #[error("transport failure for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors that can occur when dispatching an API call.
///
/// None of these are retried automatically.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// API returned a non-2xx response
    #[error("API error: {code} - {message}")]
    Status { code: u16, message: String },

    /// Response body was not the expected JSON
    #[error("Malformed response body: {0}")]
    Parse(String),
}

impl DispatchError {
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str, timeout: Duration) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            NetworkError::Timeout { url, timeout }.into()
        } else {
            NetworkError::Transport { url, source: err }.into()
        }
    }

    /// HTTP status for `Status` errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(NetworkError::Timeout { .. }))
    }
}
