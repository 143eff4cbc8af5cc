//! Search agent configuration.
//!
//! The only external setting is the backend endpoint; everything else has a
//! default that matches the stock behavior.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::http::HttpAnswerProvider;
use crate::provider::{AnswerProvider, StubAnswerProvider};
use crate::typing::TypingCadence;

/// Configuration for the answer provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Backend URL. When unset, the stub provider is used.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "ProviderConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Simulated latency of the stub provider in milliseconds.
    #[serde(default = "ProviderConfig::default_stub_delay")]
    pub stub_delay_ms: u64,
}

impl ProviderConfig {
    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_stub_delay() -> u64 {
        1600
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the stub latency as a `Duration`.
    #[must_use]
    pub fn stub_delay(&self) -> Duration {
        Duration::from_millis(self.stub_delay_ms)
    }

    /// Build the configured provider.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is set but is not a usable URL.
    pub fn build(&self) -> Result<Arc<dyn AnswerProvider>> {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => {
                tracing::info!(endpoint = %endpoint, "Using HTTP answer provider");
                Ok(Arc::new(HttpAnswerProvider::new(endpoint, self.request_timeout())?))
            }
            _ => {
                tracing::info!("No endpoint configured, using stub answer provider");
                Ok(Arc::new(StubAnswerProvider::new(self.stub_delay())))
            }
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_seconds: Self::default_request_timeout(),
            stub_delay_ms: Self::default_stub_delay(),
        }
    }
}

/// Top-level configuration for the search agent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    /// Answer provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Typing animation delays.
    #[serde(default)]
    pub typing: TypingCadence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AgentConfig::default();
        assert!(config.provider.endpoint.is_none());
        assert_eq!(config.provider.request_timeout_seconds, 30);
        assert_eq!(config.provider.stub_delay_ms, 1600);
        assert_eq!(config.typing, TypingCadence::default());
    }

    #[test]
    fn durations() {
        let config = ProviderConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.stub_delay(), Duration::from_millis(1600));
    }

    #[test]
    fn partial_deserialize() {
        let config: AgentConfig = serde_json::from_str(
            r#"{"provider": {"endpoint": "http://localhost:9000/ask"}, "typing": {"base_ms": 5}}"#,
        )
        .unwrap();
        assert_eq!(
            config.provider.endpoint.as_deref(),
            Some("http://localhost:9000/ask")
        );
        assert_eq!(config.provider.request_timeout_seconds, 30);
        assert_eq!(config.typing.base_ms, 5);
        assert_eq!(config.typing.sentence_end_ms, 200);
    }

    #[test]
    fn build_without_endpoint_uses_stub() {
        assert!(ProviderConfig::default().build().is_ok());

        let blank = ProviderConfig {
            endpoint: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.build().is_ok());
    }

    #[test]
    fn build_rejects_bad_endpoint() {
        let config = ProviderConfig {
            endpoint: Some("localhost without scheme".to_string()),
            ..Default::default()
        };
        assert!(config.build().is_err());
    }
}
