//! API routes for debate endpoints

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::OpenApi;
use uuid::Uuid;

use agora_core::wire::{
    CreateDebateRequest, CreateDebateResponse, DebateSnapshot, MessageView, PersonaInfo,
    SummaryResponse, VoteRequest, VoteResponse,
};
use agora_core::{
    compose_summary_prompt, sample_roster, strip_code_fences, DebateStatus, PersonaKey,
    VALID_TOTAL_TURNS, persona::PERSONAS,
};
use agora_llm::LlmRequest;
use agora_persist::{DebateRecord, StorageError};

use crate::advance::advance_turn;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentHealth>,
}

/// Component health status
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ComponentHealth {
    pub database: ComponentStatus,
}

/// Individual component status
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ComponentStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Basic health check handler (lightweight)
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Basic health check", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        components: None,
    })
}

/// Detailed health check with database connectivity
#[utoipa::path(
    get,
    path = "/health/detailed",
    responses(
        (status = 200, description = "Detailed health check with component status", body = HealthResponse)
    )
)]
pub async fn health_detailed(State(state): State<AppState>) -> Json<HealthResponse> {
    let start = std::time::Instant::now();
    let db_healthy = state.db().is_healthy().await;
    let db_latency = start.elapsed().as_millis() as u64;

    Json(HealthResponse {
        status: if db_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        components: Some(ComponentHealth {
            database: ComponentStatus {
                status: if db_healthy { "healthy" } else { "unhealthy" }.to_string(),
                latency_ms: Some(db_latency),
            },
        }),
    })
}

/// Create a new debate and sample its roster
#[utoipa::path(
    post,
    path = "/api/debate/start",
    request_body = CreateDebateRequest,
    responses(
        (status = 200, description = "Debate created", body = CreateDebateResponse),
        (status = 400, description = "Empty topic or disallowed turn count")
    )
)]
pub async fn create_debate(
    State(state): State<AppState>,
    Json(req): Json<CreateDebateRequest>,
) -> ApiResult<Json<CreateDebateResponse>> {
    let topic = req.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::InvalidInput(
            "Please provide a debate topic".to_string(),
        ));
    }
    if !VALID_TOTAL_TURNS.contains(&req.total_turns) {
        return Err(ApiError::InvalidInput(
            "Total turns must be 6, 9, or 12".to_string(),
        ));
    }

    let roster = sample_roster();
    let debate = state
        .store()
        .create_debate(topic, req.total_turns, roster)
        .await?;

    tracing::info!(
        debate = %debate.debate_uuid,
        roster = ?roster,
        total_turns = debate.total_turns,
        "Debate created"
    );

    Ok(Json(CreateDebateResponse {
        debate_uuid: debate.debate_uuid,
        topic: debate.topic,
        total_turns: debate.total_turns,
        personas: roster.to_vec(),
    }))
}

async fn load_debate(state: &AppState, id: Uuid) -> ApiResult<DebateRecord> {
    state
        .store()
        .fetch_debate(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Debate not found".to_string()))
}

/// Fetch the full snapshot of a debate
#[utoipa::path(
    get,
    path = "/api/debate/{id}",
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    ),
    responses(
        (status = 200, description = "Debate snapshot with full message history", body = DebateSnapshot),
        (status = 404, description = "Unknown debate")
    )
)]
pub async fn get_debate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DebateSnapshot>> {
    let debate = load_debate(&state, id).await?;
    let messages = state.store().fetch_messages(id).await?;

    let messages: Vec<MessageView> = messages
        .into_iter()
        .map(|m| MessageView {
            uuid: m.message_uuid,
            persona: m.persona,
            content: m.content,
            turn_number: m.turn_number,
            created_at: m.created_at,
        })
        .collect();

    Ok(Json(DebateSnapshot {
        debate_uuid: debate.debate_uuid,
        topic: debate.topic,
        status: debate.status,
        total_turns: debate.total_turns,
        personas: debate.roster.to_vec(),
        current_turn: messages.len() as u32,
        created_at: debate.created_at,
        messages,
    }))
}

/// Summarize each persona's position after a finished debate
#[utoipa::path(
    get,
    path = "/api/debate/{id}/summary",
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    ),
    responses(
        (status = 200, description = "Per-persona summaries", body = SummaryResponse),
        (status = 400, description = "Debate still in progress"),
        (status = 404, description = "Unknown debate"),
        (status = 502, description = "Model output could not be parsed")
    )
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SummaryResponse>> {
    let debate = load_debate(&state, id).await?;
    if debate.status != DebateStatus::Completed {
        return Err(ApiError::InvalidState(
            "The debate is still in progress".to_string(),
        ));
    }

    let messages = state.store().fetch_messages(id).await?;
    let history: Vec<(PersonaKey, String)> = messages
        .into_iter()
        .map(|m| (m.persona, m.content))
        .collect();

    let prompt = compose_summary_prompt(&debate.topic, &debate.roster, &history);
    let response = state.llm().complete(LlmRequest::simple(&prompt)).await?;

    let cleaned = strip_code_fences(&response.content);
    let summary: BTreeMap<String, String> = serde_json::from_str(&cleaned).map_err(|e| {
        tracing::error!(debate = %id, error = %e, "Summary output failed to parse as JSON");
        ApiError::Upstream("The AI backend returned an unparseable summary".to_string())
    })?;

    Ok(Json(SummaryResponse { summary }))
}

/// Voter fingerprint from request origin headers: the first
/// `x-forwarded-for` entry, then `x-real-ip`, else a sentinel.
pub(crate) fn voter_fingerprint(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Cast a vote for a roster member of a finished debate
#[utoipa::path(
    post,
    path = "/api/debate/{id}/vote",
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    ),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded; current tallies", body = VoteResponse),
        (status = 400, description = "Persona not on the roster, or debate still in progress"),
        (status = 404, description = "Unknown debate"),
        (status = 409, description = "This fingerprint already voted")
    )
)]
pub async fn post_vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    let fingerprint = voter_fingerprint(&headers);

    let debate = load_debate(&state, id).await?;
    if !debate.roster.contains(&req.persona) {
        return Err(ApiError::InvalidInput(
            "That persona is not part of this debate".to_string(),
        ));
    }
    if debate.status != DebateStatus::Completed {
        return Err(ApiError::InvalidState(
            "Voting opens after the debate has finished".to_string(),
        ));
    }

    match state.store().insert_vote(id, req.persona, &fingerprint).await {
        Ok(_) => {}
        Err(StorageError::AlreadyExists(_)) => {
            return Err(ApiError::Conflict(
                "You have already voted in this debate".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    let counts = state.store().vote_counts(id).await?;
    let mut votes: BTreeMap<String, u64> = debate
        .roster
        .iter()
        .map(|key| (key.to_string(), 0))
        .collect();
    for (key, count) in counts {
        votes.insert(key.to_string(), count);
    }

    Ok(Json(VoteResponse {
        votes,
        my_vote: req.persona,
    }))
}

/// List the static persona registry
#[utoipa::path(
    get,
    path = "/api/personas",
    responses(
        (status = 200, description = "The full persona pool", body = [PersonaInfo])
    )
)]
pub async fn list_personas() -> Json<Vec<PersonaInfo>> {
    Json(
        PERSONAS
            .iter()
            .map(|p| PersonaInfo {
                key: p.key,
                name: p.name.to_string(),
                title: p.title.to_string(),
                description: p.description.to_string(),
            })
            .collect(),
    )
}

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        health_detailed,
        create_debate,
        get_debate,
        get_summary,
        post_vote,
        list_personas,
        crate::advance::advance_turn,
    ),
    components(
        schemas(
            HealthResponse, ComponentHealth, ComponentStatus,
            CreateDebateRequest, CreateDebateResponse,
            DebateSnapshot, MessageView,
            VoteRequest, VoteResponse,
            SummaryResponse, PersonaInfo,
        )
    )
)]
pub struct ApiDoc;

/// Build the API router.
///
/// The SSE advancement route is separate (`stream_router`) so the server can
/// exempt it from the request timeout.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(health_detailed))
        .route("/api/personas", get(list_personas))
        .route("/api/debate/start", post(create_debate))
        .route("/api/debate/{id}", get(get_debate))
        .route("/api/debate/{id}/summary", get(get_summary))
        .route("/api/debate/{id}/vote", post(post_vote))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
}

/// Build the streaming router (turn advancement only)
pub fn stream_router(state: AppState) -> Router {
    Router::new()
        .route("/api/debate/{id}/next", post(advance_turn))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn fingerprint_prefers_first_forwarded_for_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(voter_fingerprint(&headers), "1.2.3.4");
    }

    #[test]
    fn fingerprint_falls_back_to_real_ip_then_sentinel() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(voter_fingerprint(&headers), "9.9.9.9");

        assert_eq!(voter_fingerprint(&HeaderMap::new()), "unknown");
    }
}
