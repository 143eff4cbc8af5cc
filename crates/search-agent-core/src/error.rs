//! Error types for the search agent.
//!
//! Provider failures are absorbed by the conversation controller and turned
//! into a visible assistant message; they never reach the UI as errors.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Failures reported by an [`AnswerProvider`](crate::provider::AnswerProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a status outside the success range.
    #[error("bad server response (status {status})")]
    Network {
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Errors raised while setting up the search agent.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_error_mentions_status() {
        let err = ProviderError::Network { status: 503 };
        assert_eq!(err.to_string(), "bad server response (status 503)");
    }

    #[test]
    fn decode_error_carries_detail() {
        let err = ProviderError::Decode("missing field `answer`".to_string());
        assert!(err.to_string().contains("missing field `answer`"));
    }
}
