use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use agora_api::{routes, AppState};
use agora_core::{DebateStatus, PersonaKey, TurnEvent};
use agora_llm::{LlmProvider, MockProvider};
use agora_persist::SqliteBackend;

async fn setup_state(llm: Arc<dyn LlmProvider>) -> AppState {
    let db = SqliteBackend::memory().await.unwrap();
    AppState::new(db, llm)
}

fn test_router(state: AppState) -> Router {
    routes::api_router(state.clone()).merge(routes::stream_router(state))
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn sse_events(response: Response) -> Vec<TurnEvent> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    text.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|payload| serde_json::from_str(payload).unwrap())
        .collect()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn create_debate(router: &Router, topic: &str, total_turns: u32) -> serde_json::Value {
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/debate/start",
            serde_json::json!({ "topic": topic, "totalTurns": total_turns }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn advance_once(router: &Router, id: &str) -> Vec<TurnEvent> {
    let response = router
        .clone()
        .oneshot(post_empty(&format!("/api/debate/{}/next", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    sse_events(response).await
}

#[tokio::test]
async fn health_check_works() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn create_debate_validates_input() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);

    // Whitespace-only topic
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/debate/start",
            serde_json::json!({ "topic": "   ", "totalTurns": 6 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INVALID_INPUT");

    // Turn count outside the allowed set
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/debate/start",
            serde_json::json!({ "topic": "ok", "totalTurns": 7 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_debate_samples_three_distinct_personas() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);

    let created = create_debate(&router, "test", 6).await;
    let personas = created["personas"].as_array().unwrap();
    assert_eq!(personas.len(), 3);
    let unique: std::collections::HashSet<&str> =
        personas.iter().map(|p| p.as_str().unwrap()).collect();
    assert_eq!(unique.len(), 3);
}

#[tokio::test]
async fn unknown_debate_is_404_everywhere() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);
    let id = uuid::Uuid::new_v4();

    for request in [
        get(&format!("/api/debate/{}", id)),
        get(&format!("/api/debate/{}/summary", id)),
        post_empty(&format!("/api/debate/{}/next", id)),
        post_json(
            &format!("/api/debate/{}/vote", id),
            serde_json::json!({ "persona": "A" }),
        ),
    ] {
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn full_debate_lifecycle() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);

    let created = create_debate(&router, "test", 6).await;
    let id = created["debateUuid"].as_str().unwrap().to_string();
    let roster: Vec<PersonaKey> =
        serde_json::from_value(created["personas"].clone()).unwrap();

    // Fresh snapshot
    let response = router
        .clone()
        .oneshot(get(&format!("/api/debate/{}", id)))
        .await
        .unwrap();
    let snapshot = body_json(response).await;
    assert_eq!(snapshot["status"], "ongoing");
    assert_eq!(snapshot["currentTurn"], 0);
    assert_eq!(snapshot["totalTurns"], 6);

    // Advance all six turns, one at a time
    for turn in 1..=6u32 {
        let events = advance_once(&router, &id).await;

        let chunks: Vec<&TurnEvent> = events
            .iter()
            .filter(|e| matches!(e, TurnEvent::Chunk { .. }))
            .collect();
        assert!(!chunks.is_empty(), "turn {turn} produced no chunks");

        match events.last().unwrap() {
            TurnEvent::Done {
                turn_number,
                persona,
                is_last_turn,
            } => {
                assert_eq!(*turn_number, turn);
                assert_eq!(*persona, roster[(turn as usize - 1) % 3]);
                assert_eq!(*is_last_turn, turn == 6);
            }
            other => panic!("turn {turn} ended with {other:?}"),
        }
    }

    // Terminal snapshot: completed, six contiguous turns
    let response = router
        .clone()
        .oneshot(get(&format!("/api/debate/{}", id)))
        .await
        .unwrap();
    let snapshot = body_json(response).await;
    assert_eq!(snapshot["status"], "completed");
    assert_eq!(snapshot["currentTurn"], 6);
    let turns: Vec<u64> = snapshot["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["turnNumber"].as_u64().unwrap())
        .collect();
    assert_eq!(turns, vec![1, 2, 3, 4, 5, 6]);

    // A seventh advancement is an invalid state, not a stream
    let response = router
        .clone()
        .oneshot(post_empty(&format!("/api/debate/{}/next", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn concurrent_advancements_persist_exactly_one_turn() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state.clone());

    let created = create_debate(&router, "race", 6).await;
    let id = created["debateUuid"].as_str().unwrap().to_string();

    let first = router
        .clone()
        .oneshot(post_empty(&format!("/api/debate/{}/next", id)));
    let second = router
        .clone()
        .oneshot(post_empty(&format!("/api/debate/{}/next", id)));

    let (first, second) = tokio::join!(first, second);
    let responses = [first.unwrap(), second.unwrap()];
    let statuses = [responses[0].status(), responses[1].status()];

    assert!(statuses.contains(&StatusCode::OK), "statuses: {statuses:?}");
    assert!(
        statuses.contains(&StatusCode::CONFLICT),
        "statuses: {statuses:?}"
    );

    // Drain the winner's stream so generation and persistence run to the end.
    for response in responses {
        if response.status() == StatusCode::OK {
            let events = sse_events(response).await;
            assert!(matches!(events.last(), Some(TurnEvent::Done { .. })));
        }
    }

    let debate_id = uuid::Uuid::parse_str(&id).unwrap();
    assert_eq!(state.store().message_count(debate_id).await.unwrap(), 1);
}

#[tokio::test]
async fn generation_failure_streams_error_and_persists_nothing() {
    let state = setup_state(Arc::new(MockProvider::failing("backend down"))).await;
    let router = test_router(state.clone());

    let created = create_debate(&router, "test", 6).await;
    let id = created["debateUuid"].as_str().unwrap().to_string();

    let events = advance_once(&router, &id).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], TurnEvent::Error { .. }));

    let debate_id = uuid::Uuid::parse_str(&id).unwrap();
    assert_eq!(state.store().message_count(debate_id).await.unwrap(), 0);
    let debate = state.store().fetch_debate(debate_id).await.unwrap().unwrap();
    assert_eq!(debate.status, DebateStatus::Ongoing);

    // The failed stream released the lock; the next attempt streams again.
    let events = advance_once(&router, &id).await;
    assert!(matches!(events[0], TurnEvent::Error { .. }));
}

async fn completed_debate(router: &Router, topic: &str) -> (String, Vec<PersonaKey>) {
    let created = create_debate(router, topic, 6).await;
    let id = created["debateUuid"].as_str().unwrap().to_string();
    let roster: Vec<PersonaKey> =
        serde_json::from_value(created["personas"].clone()).unwrap();
    for _ in 0..6 {
        advance_once(router, &id).await;
    }
    (id, roster)
}

#[tokio::test]
async fn vote_requires_completed_debate() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);

    let created = create_debate(&router, "test", 6).await;
    let id = created["debateUuid"].as_str().unwrap().to_string();
    let roster: Vec<PersonaKey> =
        serde_json::from_value(created["personas"].clone()).unwrap();

    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/debate/{}/vote", id),
            serde_json::json!({ "persona": roster[0] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn vote_tallies_and_deduplicates_by_fingerprint() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);

    let (id, roster) = completed_debate(&router, "test").await;
    let choice = roster[0];

    let vote_request = |fingerprint: &str| {
        Request::builder()
            .method("POST")
            .uri(format!("/api/debate/{}/vote", id))
            .header("Content-Type", "application/json")
            .header("x-forwarded-for", fingerprint)
            .body(Body::from(
                serde_json::json!({ "persona": choice }).to_string(),
            ))
            .unwrap()
    };

    // First vote from 1.2.3.4: chosen member at 1, the others at 0
    let response = router.clone().oneshot(vote_request("1.2.3.4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["myVote"], serde_json::json!(choice));
    assert_eq!(json["votes"][choice.as_str()], 1);
    for other in &roster[1..] {
        assert_eq!(json["votes"][other.as_str()], 0);
    }

    // Same fingerprint voting again is a conflict, count unchanged
    let response = router.clone().oneshot(vote_request("1.2.3.4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // A different fingerprint still counts
    let response = router.clone().oneshot(vote_request("5.6.7.8")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["votes"][choice.as_str()], 2);
}

#[tokio::test]
async fn vote_rejects_persona_outside_roster() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);

    let (id, roster) = completed_debate(&router, "test").await;
    let outsider = PersonaKey::ALL
        .iter()
        .find(|key| !roster.contains(key))
        .copied()
        .unwrap();

    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/debate/{}/vote", id),
            serde_json::json!({ "persona": outsider }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn summary_requires_completed_debate() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);

    let created = create_debate(&router, "test", 6).await;
    let id = created["debateUuid"].as_str().unwrap();

    let response = router
        .clone()
        .oneshot(get(&format!("/api/debate/{}/summary", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn summary_parses_fenced_model_json() {
    // The mock returns the same fenced JSON for turns and for the summary;
    // only the summary call needs to parse it.
    let canned = "```json\n{\"FactsOverFeelings\": \"Argued from the numbers.\"}\n```";
    let state = setup_state(Arc::new(MockProvider::constant(canned))).await;
    let router = test_router(state);

    let (id, _) = completed_debate(&router, "test").await;

    let response = router
        .clone()
        .oneshot(get(&format!("/api/debate/{}/summary", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["summary"]["FactsOverFeelings"],
        "Argued from the numbers."
    );
}

#[tokio::test]
async fn unparseable_summary_is_an_upstream_failure() {
    let state = setup_state(Arc::new(MockProvider::constant("I refuse to emit JSON"))).await;
    let router = test_router(state);

    let (id, _) = completed_debate(&router, "test").await;

    let response = router
        .clone()
        .oneshot(get(&format!("/api/debate/{}/summary", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "UPSTREAM_FAILURE");
}

#[tokio::test]
async fn personas_endpoint_lists_the_pool() {
    let state = setup_state(Arc::new(MockProvider::debater())).await;
    let router = test_router(state);

    let response = router.oneshot(get("/api/personas")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let pool = json.as_array().unwrap();
    assert_eq!(pool.len(), 8);
    assert!(pool.iter().all(|p| p["name"].as_str().is_some()));
}
