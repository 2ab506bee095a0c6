//! Google Gemini provider using the `generateContent` REST endpoint.
//!
//! Authenticates with the `key` query parameter.

use super::provider::{LlmProvider, LlmRequest, LlmResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini provider.
pub struct GoogleProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl GoogleProvider {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn url(&self) -> String {
        format!("{BASE_URL}/{}:generateContent", self.model)
    }

    fn request_body(&self, request: &LlmRequest) -> GenerateRequest {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: request.system.clone(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

// --- Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

fn into_response(
    resp: GenerateResponse,
    fallback_model: &str,
    latency_ms: u64,
) -> Result<LlmResponse, LlmError> {
    let text = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(LlmError::new("Google returned no candidate text"));
    }

    Ok(LlmResponse {
        text,
        model: resp
            .model_version
            .unwrap_or_else(|| fallback_model.to_string()),
        tokens_used: resp.usage_metadata.and_then(|u| u.total_token_count),
        latency_ms,
    })
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        let body = self.request_body(request);

        let resp = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| LlmError::new(format!("Google request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::new(format!("Google HTTP {status}: {text}")));
        }

        let gen_resp: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::new(format!("Failed to parse Google response: {e}")))?;

        into_response(gen_resp, &self.model, start.elapsed().as_millis() as u64)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_includes_model() {
        let provider = GoogleProvider::new("k", "gemini-1.5-flash", Duration::from_secs(30));
        assert!(provider.url().ends_with("/models/gemini-1.5-flash:generateContent"));
    }

    #[test]
    fn test_request_body_shape() {
        let provider = GoogleProvider::new("k", "gemini-1.5-flash", Duration::from_secs(30));
        let body = provider.request_body(&LlmRequest::overview("Blurb".to_string()));
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["systemInstruction"]["parts"][0]["text"].is_string());
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Blurb");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 120);
    }

    #[test]
    fn test_response_with_usage() {
        let raw = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": " Dreamy shoegaze. "}]}}],
            "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 5, "totalTokenCount": 25},
            "modelVersion": "gemini-1.5-flash-002"
        }"#;
        let resp = into_response(serde_json::from_str(raw).unwrap(), "gemini-1.5-flash", 1).unwrap();
        assert_eq!(resp.text, "Dreamy shoegaze.");
        assert_eq!(resp.tokens_used, Some(25));
        assert_eq!(resp.model, "gemini-1.5-flash-002");
    }

    #[test]
    fn test_response_without_usage_reports_none() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}"#;
        let resp = into_response(serde_json::from_str(raw).unwrap(), "gemini", 1).unwrap();
        assert_eq!(resp.tokens_used, None);
        assert_eq!(resp.model, "gemini");
    }

    #[test]
    fn test_blocked_prompt_is_error() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert!(into_response(serde_json::from_str(raw).unwrap(), "gemini", 1).is_err());
    }
}
