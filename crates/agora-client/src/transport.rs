//! Transport seam between the watcher and the server
//!
//! The watcher only needs five operations; putting them behind a trait keeps
//! the state machine testable against scripted byte streams while production
//! goes through reqwest.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use uuid::Uuid;

use agora_core::wire::{
    CreateDebateRequest, CreateDebateResponse, DebateSnapshot, ErrorResponse, SummaryResponse,
    VoteRequest, VoteResponse,
};
use agora_core::PersonaKey;

use crate::error::ClientError;

/// Raw SSE body: network-sized byte chunks in arrival order
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ClientError>> + Send>>;

/// Operations the watcher needs from the server
#[async_trait]
pub trait DebateTransport: Send + Sync {
    async fn start(
        &self,
        topic: &str,
        total_turns: u32,
    ) -> Result<CreateDebateResponse, ClientError>;

    async fn snapshot(&self, id: Uuid) -> Result<DebateSnapshot, ClientError>;

    /// Open one turn-advancement stream. Dropping the returned stream aborts
    /// the request.
    async fn advance(&self, id: Uuid) -> Result<ByteStream, ClientError>;

    async fn summary(&self, id: Uuid) -> Result<SummaryResponse, ClientError>;

    async fn vote(&self, id: Uuid, persona: PersonaKey) -> Result<VoteResponse, ClientError>;
}

/// Production transport over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Convert a non-success response into a structured error, preferring
    /// the server's envelope over a bare status code.
    async fn into_api_error(response: reqwest::Response) -> ClientError {
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => ClientError::Api {
                code: body.error.code,
                message: body.error.message,
            },
            Err(_) => ClientError::Http(format!("unexpected status {status}")),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::into_api_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::into_api_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DebateTransport for HttpTransport {
    async fn start(
        &self,
        topic: &str,
        total_turns: u32,
    ) -> Result<CreateDebateResponse, ClientError> {
        self.post_json(
            "/api/debate/start",
            &CreateDebateRequest {
                topic: topic.to_string(),
                total_turns,
            },
        )
        .await
    }

    async fn snapshot(&self, id: Uuid) -> Result<DebateSnapshot, ClientError> {
        self.get_json(&format!("/api/debate/{id}")).await
    }

    async fn advance(&self, id: Uuid) -> Result<ByteStream, ClientError> {
        let response = self
            .client
            .post(format!("{}/api/debate/{}/next", self.base_url, id))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::into_api_error(response).await);
        }

        Ok(Box::pin(response.bytes_stream().map(|next| {
            next.map(|bytes| bytes.to_vec())
                .map_err(|e| ClientError::Stream(e.to_string()))
        })))
    }

    async fn summary(&self, id: Uuid) -> Result<SummaryResponse, ClientError> {
        self.get_json(&format!("/api/debate/{id}/summary")).await
    }

    async fn vote(&self, id: Uuid, persona: PersonaKey) -> Result<VoteResponse, ClientError> {
        self.post_json(&format!("/api/debate/{id}/vote"), &VoteRequest { persona })
            .await
    }
}
