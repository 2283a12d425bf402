//! Google Gemini provider (REST generateContent API)
//!
//! One-shot generation uses `:generateContent`; incremental generation uses
//! `:streamGenerateContent?alt=sse`, which delivers the same response shape
//! in SSE `data:` lines as the model produces text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use futures::StreamExt;

use crate::provider::{LlmError, LlmProvider, LlmRequest, LlmResponse, TextStream};

/// Gemini API request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// Gemini API response format (both one-shot and per-SSE-event)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiResponse {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

/// Gemini provider for hosted inference
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    /// API key
    api_key: String,
    /// Model to use (e.g., "gemini-2.5-flash")
    model: String,
    /// HTTP client
    client: reqwest::Client,
    /// Base URL
    base_url: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    /// Create with the default flash model
    pub fn flash(api_key: &str) -> Self {
        Self::new(api_key, "gemini-2.5-flash")
    }

    /// Override the base URL (testing against a local stub)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn body(request: &LlmRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
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

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);
        self.client.get(&url).send().await.is_ok()
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&Self::body(&request))
            .send()
            .await
            .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::RequestFailed(format!(
                "Status: {}",
                response.status()
            )));
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = api_response.text();
        if content.is_empty() {
            return Err(LlmError::InvalidResponse(
                "no candidate text in response".to_string(),
            ));
        }

        Ok(LlmResponse {
            model: api_response
                .model_version
                .unwrap_or_else(|| self.model.clone()),
            content,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn complete_stream(&self, request: LlmRequest) -> TextStream {
        let client = self.client.clone();
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        );
        let body = Self::body(&request);

        Box::pin(async_stream::stream! {
            let response = match client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    yield Err(LlmError::ConnectionFailed(e.to_string()));
                    return;
                }
            };

            if !response.status().is_success() {
                yield Err(LlmError::RequestFailed(format!("Status: {}", response.status())));
                return;
            }

            // SSE framing: complete lines only, the tail stays buffered until
            // the next network chunk arrives.
            let mut buffer: Vec<u8> = Vec::new();
            let mut bytes = response.bytes_stream();

            while let Some(next) = bytes.next().await {
                let chunk = match next {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(LlmError::StreamInterrupted(e.to_string()));
                        return;
                    }
                };
                buffer.extend_from_slice(&chunk);

                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim_end_matches(['\n', '\r']);

                    let Some(payload) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    match serde_json::from_str::<GeminiResponse>(payload) {
                        Ok(event) => {
                            let text = event.text();
                            if !text.is_empty() {
                                yield Ok(text);
                            }
                        }
                        Err(e) => {
                            yield Err(LlmError::InvalidResponse(e.to_string()));
                            return;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_joins_all_parts() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] }
            }]
        }"#;
        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), "Hello world");
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
    }

    #[tokio::test]
    #[ignore] // Requires a GEMINI_API_KEY and network access
    async fn gemini_round_trip() {
        let Ok(key) = std::env::var("GEMINI_API_KEY") else {
            return;
        };
        let provider = GeminiProvider::flash(&key);
        let text = provider.ask("Say hello in one word").await.unwrap();
        assert!(!text.is_empty());
    }
}
