//! HTTP wire DTOs shared by the server and the spectator client
//!
//! Field names follow the JSON wire format (camelCase); these types are the
//! single source of truth for both sides of the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::debate::DebateStatus;
use crate::persona::PersonaKey;

/// Body of `POST /api/debate/start`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDebateRequest {
    pub topic: String,
    pub total_turns: u32,
}

/// Response of `POST /api/debate/start`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDebateResponse {
    pub debate_uuid: Uuid,
    pub topic: String,
    pub total_turns: u32,
    /// The roster sampled for this debate, in speaking order.
    pub personas: Vec<PersonaKey>,
}

/// One persisted message in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub uuid: Uuid,
    pub persona: PersonaKey,
    pub content: String,
    pub turn_number: u32,
    pub created_at: DateTime<Utc>,
}

/// Response of `GET /api/debate/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebateSnapshot {
    pub debate_uuid: Uuid,
    pub topic: String,
    pub status: DebateStatus,
    pub total_turns: u32,
    pub personas: Vec<PersonaKey>,
    /// Completed turns so far; always equal to `messages.len()`.
    pub current_turn: u32,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<MessageView>,
}

/// Body of `POST /api/debate/{id}/vote`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub persona: PersonaKey,
}

/// Response of `POST /api/debate/{id}/vote`: full tallies plus an echo of
/// the caller's choice.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    /// Vote counts per roster member key.
    pub votes: BTreeMap<String, u64>,
    pub my_vote: PersonaKey,
}

/// Response of `GET /api/debate/{id}/summary`: persona screen name to a
/// short summary of the position they argued.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: BTreeMap<String, String>,
}

/// One entry of `GET /api/personas`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonaInfo {
    pub key: PersonaKey,
    pub name: String,
    pub title: String,
    pub description: String,
}

/// Error envelope returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
