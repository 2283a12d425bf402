//! Turn advancement over SSE
//!
//! The one genuinely hard endpoint: it interleaves a slow generation call
//! with incremental delivery and must leave exactly-once durable state
//! behind. The contract, in order:
//!
//! 1. Take the per-debate lock (reject a concurrent advancement with 409).
//! 2. Validate lifecycle preconditions; failures return a plain error
//!    response before any stream is opened.
//! 3. Sequence the turn and compose the prompt from full history.
//! 4. Relay generation chunks as `chunk` events, accumulating the text.
//! 5. On completion, persist the message (and the terminal status flip on
//!    the last turn) in one transaction, then emit `done` and close.
//!
//! A failure during generation or persistence emits a single `error` event
//! and closes the stream with zero persistent side effects. If the
//! spectator disconnects, the stream future is dropped: the upstream
//! generation call is cancelled, nothing is persisted, and the lock
//! releases. An abandoned session does not advance the debate.

use axum::{
    extract::{Path, State},
    http::header,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
};
use futures::StreamExt;
use std::convert::Infallible;
use uuid::Uuid;

use agora_core::{compose_turn_prompt, plan_turn, DebateStatus, PersonaKey, TurnEvent};
use agora_llm::LlmRequest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn sse_event(event: &TurnEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_| Event::default().data(r#"{"type":"error","message":"event encoding failed"}"#))
}

/// Advance a debate by one turn, streaming the generated text
#[utoipa::path(
    post,
    path = "/api/debate/{id}/next",
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    ),
    responses(
        (status = 200, description = "SSE stream of turn events: chunk* then done|error"),
        (status = 400, description = "Debate finished or turns exhausted"),
        (status = 404, description = "Unknown debate"),
        (status = 409, description = "A turn is already being generated")
    )
)]
pub async fn advance_turn(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    // At most one in-flight advancement per debate; the guard lives as long
    // as the event stream.
    let guard = state.turn_locks().try_acquire(id).await.ok_or_else(|| {
        ApiError::Conflict("A turn is already being generated for this debate".to_string())
    })?;

    let store = state.store().clone();
    let debate = store
        .fetch_debate(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Debate not found".to_string()))?;

    if debate.status != DebateStatus::Ongoing {
        return Err(ApiError::InvalidState(
            "The debate has already finished".to_string(),
        ));
    }

    let messages = store.fetch_messages(id).await?;
    let persisted_count = messages.len() as u32;
    if persisted_count >= debate.total_turns {
        return Err(ApiError::InvalidState(
            "All turns are already completed".to_string(),
        ));
    }

    let plan = plan_turn(persisted_count, &debate.roster, debate.total_turns);
    let history: Vec<(PersonaKey, String)> = messages
        .into_iter()
        .map(|m| (m.persona, m.content))
        .collect();
    let prompt = compose_turn_prompt(plan.speaker, &debate.topic, &history);

    tracing::info!(
        debate = %id,
        turn = plan.turn_number,
        speaker = %plan.speaker,
        is_last = plan.is_last_turn,
        "Advancing turn"
    );

    let llm = state.llm();

    let stream = async_stream::stream! {
        let _guard = guard;

        let mut accumulated = String::new();
        let mut chunks = llm.complete_stream(LlmRequest::simple(&prompt));
        let mut failed = false;

        while let Some(next) = chunks.next().await {
            match next {
                Ok(text) => {
                    accumulated.push_str(&text);
                    yield Ok::<Event, Infallible>(sse_event(&TurnEvent::Chunk { content: text }));
                }
                Err(e) => {
                    tracing::error!(debate = %id, turn = plan.turn_number, error = %e, "Generation failed mid-stream");
                    yield Ok(sse_event(&TurnEvent::Error {
                        message: "The AI backend failed while generating this turn".to_string(),
                    }));
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            if accumulated.is_empty() {
                tracing::error!(debate = %id, turn = plan.turn_number, "Generation produced no text");
                yield Ok(sse_event(&TurnEvent::Error {
                    message: "The AI backend returned no text for this turn".to_string(),
                }));
            } else {
                // Persistence only after the full text is assembled; the
                // message insert and the terminal flip commit together.
                match store
                    .append_turn(id, plan.speaker, &accumulated, plan.turn_number, plan.is_last_turn)
                    .await
                {
                    Ok(_) => {
                        yield Ok(sse_event(&TurnEvent::Done {
                            turn_number: plan.turn_number,
                            persona: plan.speaker,
                            is_last_turn: plan.is_last_turn,
                        }));
                    }
                    Err(e) => {
                        tracing::error!(debate = %id, turn = plan.turn_number, error = %e, "Failed to persist turn");
                        yield Ok(sse_event(&TurnEvent::Error {
                            message: "Failed to save the generated turn".to_string(),
                        }));
                    }
                }
            }
        }
    };

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    ))
}
