//! # Agora LLM
//!
//! Generation backends for debate turns and summaries.
//!
//! Every provider exposes two operations: one-shot generation (`complete`)
//! used for summaries, and incremental generation (`complete_stream`) used
//! for live debate turns.
//!
//! ## Supported backends
//!
//! | Provider | Type | Key required |
//! |----------|------|--------------|
//! | Gemini | API | `GEMINI_API_KEY` |
//! | Ollama | Local | None |
//! | Mock | Testing | None |
//!
//! ## Quick start
//!
//! ```rust
//! use agora_llm::{LlmProvider, MockProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     let llm = MockProvider::constant("A short, punchy argument.");
//!     let text = llm.ask("Open the debate").await.unwrap();
//!     assert!(!text.is_empty());
//! }
//! ```

pub mod config;
pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod provider;

pub use config::LlmConfig;
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use provider::{LlmError, LlmProvider, LlmRequest, LlmResponse, TextStream};
