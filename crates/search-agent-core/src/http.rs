//! HTTP answer provider.
//!
//! Posts the question as JSON to a search backend and reads the answer from
//! the JSON response body.
//!
//! Endpoint: POST {endpoint} `{"question": "..."}` → `{"answer": "..."}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ProviderError, Result};
use crate::provider::AnswerProvider;

/// Request body sent to the backend.
#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

/// Response body returned by the backend.
#[derive(Debug, Deserialize)]
struct AskResponse {
    answer: String,
}

/// Answer provider backed by a real HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpAnswerProvider {
    client: Client,
    endpoint: Url,
}

impl HttpAnswerProvider {
    /// Create a provider for `endpoint` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an absolute http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| CoreError::InvalidConfig(format!("failed to create HTTP client: {e}")))?;

        Self::with_client(client, endpoint)
    }

    /// Create a provider with a custom reqwest client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an absolute http(s) URL.
    pub fn with_client(client: Client, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CoreError::InvalidConfig(format!("invalid endpoint `{endpoint}`: {e}")))?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(CoreError::InvalidConfig(format!(
                "unsupported endpoint scheme `{}`",
                endpoint.scheme()
            )));
        }

        Ok(Self { client, endpoint })
    }

    /// Get the endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl AnswerProvider for HttpAnswerProvider {
    async fn ask(&self, question: &str) -> std::result::Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&AskRequest { question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                endpoint = %self.endpoint,
                status = %status,
                "Search backend returned an error status"
            );
            return Err(ProviderError::Network {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: AskResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;

        tracing::debug!(endpoint = %self.endpoint, chars = parsed.answer.chars().count(), "Received answer");
        Ok(parsed.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn provider_for(server: &MockServer) -> HttpAnswerProvider {
        HttpAnswerProvider::new(&format!("{}/ask", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn ask_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ask"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({ "question": "what is tokio?" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "answer": "An async runtime." })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let answer = provider_for(&server).ask("what is tokio?").await.unwrap();
        assert_eq!(answer, "An async runtime.");
    }

    #[tokio::test]
    async fn ask_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let result = provider_for(&server).ask("anything").await;
        assert!(matches!(result, Err(ProviderError::Network { status: 502 })));
    }

    #[tokio::test]
    async fn ask_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = provider_for(&server).ask("anything").await;
        assert!(matches!(result, Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn ask_missing_answer_field() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "x" })),
            )
            .mount(&server)
            .await;

        let result = provider_for(&server).ask("anything").await;
        match result {
            Err(ProviderError::Decode(detail)) => assert!(detail.contains("answer")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let result = HttpAnswerProvider::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(CoreError::InvalidConfig(_))));

        let result = HttpAnswerProvider::new("ftp://example.com/ask", Duration::from_secs(5));
        assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn keeps_endpoint() {
        let provider =
            HttpAnswerProvider::new("http://localhost:9000/ask", Duration::from_secs(5)).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:9000/ask");
    }
}
