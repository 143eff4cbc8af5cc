//! Answer providers.
//!
//! The controller only knows the [`AnswerProvider`] trait. The stub
//! implementation stands in when no backend endpoint is configured; the HTTP
//! implementation lives in [`crate::http`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;

/// Source of answers for the conversation controller.
///
/// This trait abstracts the backend, allowing the stub, the HTTP client and
/// scripted implementations in tests to be swapped freely.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Answer a question.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached, answers with a
    /// failure status, or returns a body that cannot be decoded.
    async fn ask(&self, question: &str) -> Result<String, ProviderError>;
}

/// Default simulated latency of the stub provider.
pub const DEFAULT_STUB_DELAY: Duration = Duration::from_millis(1600);

/// A provider that answers every question with a canned response.
///
/// Used when no backend is configured.
#[derive(Debug, Clone)]
pub struct StubAnswerProvider {
    delay: Duration,
}

impl StubAnswerProvider {
    /// Create a stub provider that waits `delay` before answering.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Simulated latency before each answer.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for StubAnswerProvider {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DELAY)
    }
}

#[async_trait]
impl AnswerProvider for StubAnswerProvider {
    async fn ask(&self, question: &str) -> Result<String, ProviderError> {
        tracing::debug!(delay_ms = self.delay.as_millis(), "StubAnswerProvider: simulating search");
        tokio::time::sleep(self.delay).await;
        Ok(canned_answer(question))
    }
}

/// The synthetic answer returned by [`StubAnswerProvider`].
#[must_use]
pub fn canned_answer(question: &str) -> String {
    format!(
        "Here is what I found about \"{question}\":\n\
         \n\
         1. Start with the official documentation. It covers the fundamentals and the usual pitfalls.\n\
         2. Compare a few recent sources, since details often change between versions.\n\
         3. Try a small example yourself to confirm the behavior.\n\
         \n\
         Ask a follow-up question if you want me to go deeper on any of these points."
    )
}
