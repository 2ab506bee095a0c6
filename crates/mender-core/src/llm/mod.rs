//! LLM integration for overview generation.
//!
//! Provides a provider abstraction over multiple LLM backends (OpenAI,
//! Anthropic, Google Gemini, local Ollama) and a rewriter that prompts one
//! item at a time and turns every failure into a skip.

pub(crate) mod anthropic;
pub(crate) mod google;
pub(crate) mod ollama;
pub(crate) mod openai;
pub mod prompt;
pub(crate) mod provider;
pub(crate) mod rewriter;

pub use provider::{
    LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse, UnavailableProvider, MAX_TOKENS,
    SYSTEM_PROMPT, TEMPERATURE,
};
pub use rewriter::{Rewrite, Rewriter};
