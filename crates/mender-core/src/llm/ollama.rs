//! Ollama LLM provider for local model inference.
//!
//! Talks to a local Ollama instance via its `/api/chat` endpoint.
//! No authentication required, just a running Ollama.

use super::provider::{LlmProvider, LlmRequest, LlmResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Where Ollama listens unless configured otherwise.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Ollama provider for local inference.
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Self {
        let endpoint = endpoint.trim_end_matches('/');
        // OLLAMA_HOST is often a bare host:port
        let endpoint = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };
        Self {
            endpoint,
            model: model.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn request_body(&self, request: &LlmRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt.clone(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

/// Ollama /api/chat request body.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama /api/chat response.
#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

fn into_response(resp: ChatResponse, model: &str, latency_ms: u64) -> Result<LlmResponse, LlmError> {
    let text = resp
        .message
        .map(|m| m.content.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(LlmError::new(
            "Ollama returned empty response, no content generated",
        ));
    }

    Ok(LlmResponse {
        text,
        model: model.to_string(),
        tokens_used: Some(resp.prompt_eval_count + resp.eval_count),
        latency_ms,
    })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/api/chat", self.endpoint);
        let start = Instant::now();
        let body = self.request_body(request);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| LlmError::new(format!("Ollama request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::new(format!("Ollama HTTP {status}: {text}")));
        }

        let chat_resp: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::new(format!("Failed to parse Ollama response: {e}")))?;

        into_response(chat_resp, &self.model, start.elapsed().as_millis() as u64)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_scheme() {
        let provider = OllamaProvider::new("127.0.0.1:11434", "llama3.2", Duration::from_secs(30));
        assert_eq!(provider.endpoint, "http://127.0.0.1:11434");
        let provider = OllamaProvider::new("http://gpu-box:11434/", "llama3.2", Duration::from_secs(30));
        assert_eq!(provider.endpoint, "http://gpu-box:11434");
    }

    #[test]
    fn test_request_body_is_non_streaming() {
        let provider = OllamaProvider::new(DEFAULT_ENDPOINT, "llama3.2", Duration::from_secs(30));
        let body = provider.request_body(&LlmRequest::overview("x".to_string()));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 120);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_response_sums_eval_counts() {
        let raw = r#"{
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "Local text.\n"},
            "done": true,
            "prompt_eval_count": 33,
            "eval_count": 9
        }"#;
        let resp = into_response(serde_json::from_str(raw).unwrap(), "llama3.2", 1).unwrap();
        assert_eq!(resp.text, "Local text.");
        assert_eq!(resp.tokens_used, Some(42));
    }

    #[test]
    fn test_missing_counts_default_to_zero() {
        let raw = r#"{"message": {"content": "ok"}}"#;
        let resp = into_response(serde_json::from_str(raw).unwrap(), "m", 1).unwrap();
        assert_eq!(resp.tokens_used, Some(0));
    }

    #[test]
    fn test_empty_message_is_error() {
        let raw = r#"{"message": {"content": "   "}}"#;
        assert!(into_response(serde_json::from_str(raw).unwrap(), "m", 1).is_err());
    }
}
