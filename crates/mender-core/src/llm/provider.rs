//! LLM provider trait and request/response types.
//!
//! Defines the interface that all text-generation backends implement, plus the
//! factory that creates the right backend from the configured provider name.

use crate::config::{resolve_env_var, Config};
use crate::error::LlmError;
use async_trait::async_trait;
use std::time::Duration;

/// Instruction sent alongside every prompt.
pub const SYSTEM_PROMPT: &str = "You craft concise, engaging overviews for music and media items.";

/// Output cap for one overview.
pub const MAX_TOKENS: u32 = 120;

/// Sampling temperature for all backends.
pub const TEMPERATURE: f32 = 0.4;

/// A request to generate one overview.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// System instruction
    pub system: String,
    /// Item-specific prompt
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl LlmRequest {
    /// Wrap a composed prompt with the standard instruction and sampling settings.
    pub fn overview(prompt: String) -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

/// The response from an LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text, trimmed
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn LlmProvider>` for dynamic dispatch).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "anthropic", "local").
    fn name(&self) -> &str;

    /// Generate text for the given request.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Stand-in for a backend that could not be set up.
///
/// Every call fails with the setup error, so each item is skipped with a
/// warning instead of the run aborting.
pub struct UnavailableProvider {
    name: String,
    reason: String,
}

impl UnavailableProvider {
    pub fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for UnavailableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::new(self.reason.clone()))
    }

    fn timeout(&self) -> Duration {
        Duration::ZERO
    }
}

/// Pick a credential from config, falling back to a conventional env var.
fn credential(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .and_then(resolve_env_var)
        .or_else(|| std::env::var(env_var).ok().filter(|v| !v.is_empty()))
}

/// Factory that creates the appropriate provider from the config.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider by name.
    ///
    /// # Arguments
    /// * `provider` - Provider identifier ("openai", "anthropic", "google", "local"/"ollama")
    /// * `config` - The loaded configuration (credentials, endpoints, timeout)
    /// * `model` - Model name passed through to the backend
    pub fn create(
        provider: &str,
        config: &Config,
        model: &str,
    ) -> Result<Box<dyn LlmProvider>, LlmError> {
        let timeout = Duration::from_secs(config.library.request_timeout_secs);
        let llm = &config.llm;
        match provider {
            "openai" => {
                let api_key = credential(llm.openai_api_key.as_deref(), "OPENAI_API_KEY")
                    .ok_or_else(|| {
                        LlmError::new("OpenAI API key not set. Set openai_api_key or OPENAI_API_KEY.")
                    })?;
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &api_key, model, timeout,
                )))
            }
            "anthropic" => {
                let api_key = credential(llm.anthropic_api_key.as_deref(), "ANTHROPIC_API_KEY")
                    .ok_or_else(|| {
                        LlmError::new(
                            "Anthropic API key not set. Set anthropic_api_key or ANTHROPIC_API_KEY.",
                        )
                    })?;
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key, model, timeout,
                )))
            }
            "google" => {
                let api_key = credential(llm.google_api_key.as_deref(), "GOOGLE_API_KEY")
                    .ok_or_else(|| {
                        LlmError::new("Google API key not set. Set google_api_key or GOOGLE_API_KEY.")
                    })?;
                Ok(Box::new(super::google::GoogleProvider::new(
                    &api_key, model, timeout,
                )))
            }
            "local" | "ollama" => {
                let endpoint = credential(llm.ollama_url.as_deref(), "OLLAMA_HOST")
                    .unwrap_or_else(|| super::ollama::DEFAULT_ENDPOINT.to_string());
                Ok(Box::new(super::ollama::OllamaProvider::new(
                    &endpoint, model, timeout,
                )))
            }
            other => Err(LlmError::new(format!(
                "Unknown or unsupported provider: {other}"
            ))),
        }
    }

    /// Like [`create`](Self::create), but never fails: a backend that cannot be
    /// built becomes an [`UnavailableProvider`] that reports the reason per item.
    pub fn create_or_unavailable(provider: &str, config: &Config, model: &str) -> Box<dyn LlmProvider> {
        match Self::create(provider, config, model) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("LLM provider '{provider}' unavailable: {e}");
                Box::new(UnavailableProvider::new(provider, e.message))
            }
        }
    }
}
