//! Error types for adapters.

use carwatch_poller::FetchError;
use thiserror::Error;

/// Errors that can occur while fetching from a telemetry source.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Reading a recorded response failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The API answered with an error body.
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    /// The adapter was configured incorrectly.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

impl From<AdapterError> for FetchError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Api { code, message } => crate::kamereon::classify(&code, &message),
            other => FetchError::Remote(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_are_classified() {
        let err = AdapterError::Api {
            code: "err.func.403".into(),
            message: "Access is denied for this resource".into(),
        };
        assert!(matches!(FetchError::from(err), FetchError::AccessDenied(_)));
    }

    #[test]
    fn transport_errors_are_remote() {
        assert_eq!(
            FetchError::from(AdapterError::Timeout),
            FetchError::Remote("Request timed out".into())
        );
    }
}
