//! Ollama provider for local inference

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::provider::{LlmError, LlmProvider, LlmRequest, LlmResponse, TextStream};

/// Ollama API request format
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format; in streaming mode one of these arrives per
/// NDJSON line, with `done: true` on the final line.
#[derive(Debug, Deserialize)]
struct OllamaApiResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    done: bool,
}

/// Ollama provider for local LLM inference
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for the Ollama API
    base_url: String,
    /// Model to use (e.g., "llama3", "mistral")
    model: String,
    /// HTTP client
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider with default settings
    pub fn new(model: &str) -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create with custom base URL
    pub fn with_url(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn body(&self, request: &LlmRequest, stream: bool) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client.get(&url).send().await.is_ok()
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.body(&request, false))
            .send()
            .await
            .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::RequestFailed(format!(
                "Status: {}",
                response.status()
            )));
        }

        let api_response: OllamaApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(LlmResponse {
            content: api_response.response,
            model: api_response.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn complete_stream(&self, request: LlmRequest) -> TextStream {
        let client = self.client.clone();
        let url = format!("{}/api/generate", self.base_url);
        let body = self.body(&request, true);

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

            // NDJSON framing: one JSON object per line
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
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<OllamaApiResponse>(line) {
                        Ok(event) => {
                            if !event.response.is_empty() {
                                yield Ok(event.response);
                            }
                            if event.done {
                                return;
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
