//! Overview rewriter: prompt an LLM provider for one item at a time.
//!
//! Every failure is absorbed here. The caller only ever sees `Some(rewrite)`
//! or `None`, so one bad item never stops a run.

use super::prompt;
use super::provider::{LlmProvider, LlmRequest};
use crate::types::Item;
use std::time::Duration;

/// A generated overview plus what it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// Tokens reported by the backend, 0 when it reports none
    pub tokens: u64,
}

/// Wraps a provider and turns items into overviews.
pub struct Rewriter {
    provider: Box<dyn LlmProvider>,
}

impl Rewriter {
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Name of the backing provider, for logs.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a new overview for `item`, or `None` on any failure.
    pub async fn rewrite(&self, item: &Item) -> Option<Rewrite> {
        let request = LlmRequest::overview(prompt::compose(item));
        tracing::debug!("Prompt for {}: {}", item.id, request.prompt);

        // Backends set their own HTTP timeout; this is the backstop for the whole call.
        let deadline = self.provider.timeout() + Duration::from_secs(5);
        let result = tokio::time::timeout(deadline, self.provider.generate(&request)).await;

        match result {
            Ok(Ok(response)) => {
                let text = response.text.trim().to_string();
                if text.is_empty() {
                    tracing::warn!(
                        "{} returned empty text for ID {}",
                        self.provider.name(),
                        item.id
                    );
                    return None;
                }
                tracing::debug!(
                    "{} ({}) answered for {} in {}ms",
                    self.provider.name(),
                    response.model,
                    item.id,
                    response.latency_ms
                );
                Some(Rewrite {
                    text,
                    tokens: response.tokens_used.map(u64::from).unwrap_or(0),
                })
            }
            Ok(Err(e)) => {
                tracing::warn!("{} error for ID {}: {e}", self.provider.name(), item.id);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "{} timed out after {:?} for ID {}",
                    self.provider.name(),
                    deadline,
                    item.id
                );
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::{LlmResponse, UnavailableProvider};
    use crate::types::ItemKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// A configurable mock LLM provider.
    ///
    /// Each call to `generate()` invokes the response factory with the current
    /// call index, so tests can vary the result per item.
    pub(crate) struct MockProvider {
        response_fn: Box<dyn Fn(u32) -> Result<LlmResponse, LlmError> + Send + Sync>,
        call_count: Arc<AtomicU32>,
        prompts: Arc<Mutex<Vec<String>>>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        pub(crate) fn with_fn(
            f: impl Fn(u32) -> Result<LlmResponse, LlmError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                response_fn: Box::new(f),
                call_count: Arc::new(AtomicU32::new(0)),
                prompts: Arc::new(Mutex::new(Vec::new())),
                delay: None,
            }
        }

        pub(crate) fn success(text: &str, tokens: Option<u32>) -> Self {
            let text = text.to_string();
            Self::with_fn(move |_| Ok(response(&text, tokens)))
        }

        pub(crate) fn failing(message: &str) -> Self {
            let message = message.to_string();
            Self::with_fn(move |_| Err(LlmError::new(message.clone())))
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Shared handle to the call counter (clone before moving the provider).
        pub(crate) fn call_count_handle(&self) -> Arc<AtomicU32> {
            self.call_count.clone()
        }

        pub(crate) fn prompts_handle(&self) -> Arc<Mutex<Vec<String>>> {
            self.prompts.clone()
        }
    }

    pub(crate) fn response(text: &str, tokens: Option<u32>) -> LlmResponse {
        LlmResponse {
            text: text.to_string(),
            model: "mock-v1".to_string(),
            tokens_used: tokens,
            latency_ms: 1,
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.response_fn)(idx)
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }
    }

    fn album() -> Item {
        Item::new("a1", ItemKind::Album, "Homogenic")
    }

    #[tokio::test]
    async fn test_rewrite_success_counts_tokens() {
        let rewriter = Rewriter::new(Box::new(MockProvider::success("  Icy strings.  ", Some(42))));
        let rewrite = rewriter.rewrite(&album()).await.unwrap();
        assert_eq!(rewrite.text, "Icy strings.");
        assert_eq!(rewrite.tokens, 42);
    }

    #[tokio::test]
    async fn test_rewrite_without_usage_reports_zero_tokens() {
        let rewriter = Rewriter::new(Box::new(MockProvider::success("Text.", None)));
        assert_eq!(rewriter.rewrite(&album()).await.unwrap().tokens, 0);
    }

    #[tokio::test]
    async fn test_rewrite_failure_is_none() {
        let rewriter = Rewriter::new(Box::new(MockProvider::failing("quota exceeded")));
        assert!(rewriter.rewrite(&album()).await.is_none());
    }

    #[tokio::test]
    async fn test_rewrite_empty_text_is_none() {
        let rewriter = Rewriter::new(Box::new(MockProvider::success("   ", Some(3))));
        assert!(rewriter.rewrite(&album()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_timeout_is_none() {
        // Mock timeout is 50ms, backstop adds 5s; sleep past both
        let provider = MockProvider::success("late", Some(1)).with_delay(Duration::from_secs(10));
        let rewriter = Rewriter::new(Box::new(provider));
        assert!(rewriter.rewrite(&album()).await.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_none() {
        let rewriter = Rewriter::new(Box::new(UnavailableProvider::new("nope", "not configured")));
        assert!(rewriter.rewrite(&album()).await.is_none());
    }

    #[tokio::test]
    async fn test_rewrite_sends_composed_prompt() {
        let provider = MockProvider::success("ok", None);
        let prompts = provider.prompts_handle();
        let rewriter = Rewriter::new(Box::new(provider));
        rewriter.rewrite(&album()).await;
        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Homogenic"));
    }
}
