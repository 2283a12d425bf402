//! Provider configuration
//!
//! Backend selection is env-driven: `AGORA_LLM_PROVIDER` picks explicitly,
//! otherwise Gemini is used when `GEMINI_API_KEY` is present, falling back
//! to the mock provider with a warning.

use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

use crate::gemini::GeminiProvider;
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::provider::LlmProvider;

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Gemini API key (env: GEMINI_API_KEY)
    pub gemini_api_key: Option<String>,
    /// Gemini model (env: AGORA_GEMINI_MODEL)
    pub gemini_model: String,
    /// Ollama base URL (env: OLLAMA_URL)
    pub ollama_url: String,
    /// Ollama model (env: AGORA_OLLAMA_MODEL)
    pub ollama_model: String,
    /// Explicit provider override (env: AGORA_LLM_PROVIDER)
    pub provider: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3".to_string(),
            provider: None,
        }
    }
}

impl LlmConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            gemini_model: env::var("AGORA_GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("AGORA_OLLAMA_MODEL").unwrap_or_else(|_| "llama3".to_string()),
            provider: env::var("AGORA_LLM_PROVIDER").ok(),
        }
    }

    /// Build the configured provider.
    ///
    /// With no explicit override: Gemini when a key is configured, else the
    /// mock provider (with a warning, since mock output is canned).
    pub fn build_provider(&self) -> Arc<dyn LlmProvider> {
        match self.provider.as_deref() {
            Some("gemini") => {
                let key = self.gemini_api_key.clone().unwrap_or_default();
                if key.is_empty() {
                    tracing::warn!("AGORA_LLM_PROVIDER=gemini but GEMINI_API_KEY is empty");
                }
                Arc::new(GeminiProvider::new(&key, &self.gemini_model))
            }
            Some("ollama") => Arc::new(OllamaProvider::with_url(
                &self.ollama_url,
                &self.ollama_model,
            )),
            Some("mock") => Arc::new(MockProvider::debater()),
            Some(other) => {
                tracing::warn!(provider = other, "Unknown provider, falling back to mock");
                Arc::new(MockProvider::debater())
            }
            None => {
                if let Some(key) = &self.gemini_api_key {
                    tracing::info!(model = %self.gemini_model, "Initializing Gemini provider");
                    Arc::new(GeminiProvider::new(key, &self.gemini_model))
                } else {
                    tracing::warn!("GEMINI_API_KEY not found. Using mock provider.");
                    Arc::new(MockProvider::debater())
                }
            }
        }
    }
}
