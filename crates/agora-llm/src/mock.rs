//! Mock LLM provider for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::provider::{LlmError, LlmProvider, LlmRequest, LlmResponse, TextStream};

/// A mock provider that cycles through predefined responses.
///
/// Streaming splits each response into word-sized fragments with a short
/// simulated delay, so consumers exercise the same buffering and coalescing
/// paths they hit against a real backend.
#[derive(Debug)]
pub struct MockProvider {
    /// Name of this mock
    pub name: String,
    /// Canned responses (cycles through them)
    responses: Vec<String>,
    /// Current response index
    index: AtomicUsize,
    /// Simulated latency per streamed fragment in ms
    chunk_latency_ms: u64,
    /// When set, every call fails with this message
    failure: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider with given responses
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            name: "mock".to_string(),
            responses,
            index: AtomicUsize::new(0),
            chunk_latency_ms: 2,
            failure: None,
        }
    }

    /// Create a mock that always returns the same response
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Create a mock with debate-shaped canned lines
    pub fn debater() -> Self {
        Self::new(vec![
            "Look at the numbers first, then we can talk about how everyone feels.".to_string(),
            "I hear that, but people are not spreadsheets and this affects real lives.".to_string(),
            "Can I be honest? Both of you are dodging the actual question.".to_string(),
        ])
    }

    /// Create a mock where every call fails (error-path testing)
    pub fn failing(message: &str) -> Self {
        Self {
            name: "failing-mock".to_string(),
            responses: vec![],
            index: AtomicUsize::new(0),
            chunk_latency_ms: 0,
            failure: Some(message.to_string()),
        }
    }

    fn next_response(&self) -> String {
        if self.responses.is_empty() {
            return String::new();
        }
        let idx = self.index.fetch_add(1, Ordering::Relaxed);
        self.responses[idx % self.responses.len()].clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        if let Some(message) = &self.failure {
            return Err(LlmError::RequestFailed(message.clone()));
        }

        tokio::time::sleep(std::time::Duration::from_millis(self.chunk_latency_ms)).await;

        Ok(LlmResponse {
            content: self.next_response(),
            model: self.name.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn complete_stream(&self, _request: LlmRequest) -> TextStream {
        let failure = self.failure.clone();
        let response = self.next_response();
        let delay = std::time::Duration::from_millis(self.chunk_latency_ms);

        Box::pin(async_stream::stream! {
            if let Some(message) = failure {
                yield Err(LlmError::RequestFailed(message));
                return;
            }

            // Word-sized fragments, whitespace preserved so that
            // concatenating the fragments reproduces the full text.
            let mut rest = response.as_str();
            while !rest.is_empty() {
                let split = rest
                    .char_indices()
                    .find(|(_, c)| c.is_whitespace())
                    .map(|(i, c)| i + c.len_utf8())
                    .unwrap_or(rest.len());
                let (fragment, tail) = rest.split_at(split);
                rest = tail;
                tokio::time::sleep(delay).await;
                yield Ok(fragment.to_string());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn constant_mock_answers() {
        let mock = MockProvider::constant("Hello, world!");
        let response = mock.ask("test").await.unwrap();
        assert_eq!(response, "Hello, world!");
    }

    #[tokio::test]
    async fn responses_cycle_in_order() {
        let mock = MockProvider::new(vec!["one".to_string(), "two".to_string()]);
        assert_eq!(mock.ask("a").await.unwrap(), "one");
        assert_eq!(mock.ask("b").await.unwrap(), "two");
        assert_eq!(mock.ask("c").await.unwrap(), "one");
    }

    #[tokio::test]
    async fn streamed_fragments_reassemble_exactly() {
        let text = "A short, punchy argument with  double spaces.";
        let mock = MockProvider::constant(text);
        let mut stream = mock.complete_stream(LlmRequest::simple("test"));

        let mut assembled = String::new();
        let mut fragments = 0;
        while let Some(chunk) = stream.next().await {
            assembled.push_str(&chunk.unwrap());
            fragments += 1;
        }
        assert_eq!(assembled, text);
        assert!(fragments > 1);
    }

    #[tokio::test]
    async fn failing_mock_fails_both_paths() {
        let mock = MockProvider::failing("backend down");
        assert!(mock.ask("test").await.is_err());

        let mut stream = mock.complete_stream(LlmRequest::simple("test"));
        let first = stream.next().await.unwrap();
        assert!(first.is_err());
        assert!(stream.next().await.is_none());
    }
}
