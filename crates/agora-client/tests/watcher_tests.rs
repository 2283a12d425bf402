use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use agora_client::{ByteStream, ClientError, DebateTransport, DebateWatcher, WatcherUpdate};
use agora_core::wire::{CreateDebateResponse, DebateSnapshot, SummaryResponse, VoteResponse};
use agora_core::{DebateStatus, PersonaKey, TurnEvent};

const ROSTER: [PersonaKey; 3] = [PersonaKey::A, PersonaKey::D, PersonaKey::G];

fn snapshot(status: DebateStatus, total_turns: u32, current_turn: u32) -> DebateSnapshot {
    DebateSnapshot {
        debate_uuid: Uuid::new_v4(),
        topic: "test".to_string(),
        status,
        total_turns,
        personas: ROSTER.to_vec(),
        current_turn,
        created_at: chrono::Utc::now(),
        messages: vec![],
    }
}

fn wire(events: &[TurnEvent]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for event in events {
        bytes.extend_from_slice(b"data: ");
        bytes.extend_from_slice(serde_json::to_string(event).unwrap().as_bytes());
        bytes.extend_from_slice(b"\n\n");
    }
    bytes
}

/// Split a byte run into fixed-size network chunks
fn chunked(bytes: Vec<u8>, size: usize) -> ByteStream {
    let chunks: Vec<Result<Vec<u8>, ClientError>> =
        bytes.chunks(size).map(|c| Ok(c.to_vec())).collect();
    Box::pin(futures::stream::iter(chunks))
}

struct ScriptedTransport {
    snapshot: DebateSnapshot,
    streams: Arc<Mutex<VecDeque<ByteStream>>>,
}

impl ScriptedTransport {
    fn new(snapshot: DebateSnapshot, streams: Vec<ByteStream>) -> (Self, Arc<Mutex<VecDeque<ByteStream>>>) {
        let shared = Arc::new(Mutex::new(streams.into_iter().collect::<VecDeque<_>>()));
        (
            Self {
                snapshot,
                streams: shared.clone(),
            },
            shared,
        )
    }
}

#[async_trait]
impl DebateTransport for ScriptedTransport {
    async fn start(&self, _: &str, _: u32) -> Result<CreateDebateResponse, ClientError> {
        Err(ClientError::Http("not scripted".to_string()))
    }

    async fn snapshot(&self, _: Uuid) -> Result<DebateSnapshot, ClientError> {
        Ok(self.snapshot.clone())
    }

    async fn advance(&self, _: Uuid) -> Result<ByteStream, ClientError> {
        self.streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Http("no more scripted streams".to_string()))
    }

    async fn summary(&self, _: Uuid) -> Result<SummaryResponse, ClientError> {
        Err(ClientError::Http("not scripted".to_string()))
    }

    async fn vote(&self, _: Uuid, _: PersonaKey) -> Result<VoteResponse, ClientError> {
        Err(ClientError::Http("not scripted".to_string()))
    }
}

async fn run_and_collect(
    transport: ScriptedTransport,
    cancel: CancellationToken,
) -> (Result<(), ClientError>, Vec<WatcherUpdate>) {
    let (tx, mut rx) = mpsc::channel(64);
    let watcher = DebateWatcher::new(transport, Uuid::new_v4(), tx, cancel)
        .with_frame_interval(Duration::from_millis(30));

    let handle = tokio::spawn(watcher.run());
    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }
    (handle.await.unwrap(), updates)
}

#[tokio::test]
async fn watcher_runs_debate_to_completion() {
    let total_turns = 6u32;
    let mut streams = Vec::new();
    for turn in 1..=total_turns {
        let events = vec![
            TurnEvent::Chunk {
                content: "Hello ".to_string(),
            },
            TurnEvent::Chunk {
                content: format!("world {turn}"),
            },
            TurnEvent::Done {
                turn_number: turn,
                persona: ROSTER[(turn as usize - 1) % 3],
                is_last_turn: turn == total_turns,
            },
        ];
        // 5-byte network chunks: every event arrives split mid-line
        streams.push(chunked(wire(&events), 5));
    }

    let (transport, remaining) =
        ScriptedTransport::new(snapshot(DebateStatus::Ongoing, total_turns, 0), streams);
    let (result, updates) = run_and_collect(transport, CancellationToken::new()).await;

    assert!(result.is_ok());
    assert!(remaining.lock().unwrap().is_empty());

    assert!(matches!(updates.first(), Some(WatcherUpdate::Snapshot(_))));
    assert!(matches!(updates.last(), Some(WatcherUpdate::Completed)));

    let completed: Vec<_> = updates
        .iter()
        .filter_map(|u| match u {
            WatcherUpdate::TurnCompleted {
                persona,
                turn_number,
                content,
                ..
            } => Some((*persona, *turn_number, content.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(completed.len(), 6);
    for (i, (persona, turn_number, content)) in completed.iter().enumerate() {
        let expected_turn = (i + 1) as u32;
        assert_eq!(*turn_number, expected_turn);
        assert_eq!(*persona, ROSTER[i % 3]);
        assert_eq!(*content, format!("Hello world {expected_turn}"));
    }
}

#[tokio::test]
async fn already_completed_debate_emits_completed_immediately() {
    let (transport, _) = ScriptedTransport::new(snapshot(DebateStatus::Completed, 6, 6), vec![]);
    let (result, updates) = run_and_collect(transport, CancellationToken::new()).await;

    assert!(result.is_ok());
    assert_eq!(updates.len(), 2);
    assert!(matches!(updates[0], WatcherUpdate::Snapshot(_)));
    assert!(matches!(updates[1], WatcherUpdate::Completed));
}

#[tokio::test]
async fn server_error_event_halts_the_loop() {
    let failing = wire(&[
        TurnEvent::Chunk {
            content: "partial".to_string(),
        },
        TurnEvent::Error {
            message: "backend exploded".to_string(),
        },
    ]);
    // A second stream exists but must never be requested after the error.
    let spare = wire(&[TurnEvent::Done {
        turn_number: 1,
        persona: PersonaKey::A,
        is_last_turn: false,
    }]);

    let (transport, remaining) = ScriptedTransport::new(
        snapshot(DebateStatus::Ongoing, 6, 0),
        vec![chunked(failing, 7), chunked(spare, 7)],
    );
    let (result, updates) = run_and_collect(transport, CancellationToken::new()).await;

    assert!(matches!(result, Err(ClientError::Turn(_))));
    assert!(matches!(
        updates.last(),
        Some(WatcherUpdate::Failed { .. })
    ));
    assert!(!updates
        .iter()
        .any(|u| matches!(u, WatcherUpdate::Completed)));
    assert_eq!(remaining.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancellation_stops_cleanly_without_an_error() {
    // One chunk arrives, then the stream hangs forever.
    let head = wire(&[TurnEvent::Chunk {
        content: "never finishes".to_string(),
    }]);
    let hanging: ByteStream = Box::pin(async_stream::stream! {
        yield Ok(head);
        futures::future::pending::<()>().await;
    });

    let (transport, _) =
        ScriptedTransport::new(snapshot(DebateStatus::Ongoing, 6, 0), vec![hanging]);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(80)).await;
        canceller.cancel();
    });

    let (result, updates) = run_and_collect(transport, cancel).await;

    // Deliberate teardown: a clean stop, not a surfaced error.
    assert!(result.is_ok());
    assert!(!updates.iter().any(|u| matches!(u, WatcherUpdate::Failed { .. })));
    assert!(!updates.iter().any(|u| matches!(u, WatcherUpdate::Completed)));
}

#[tokio::test]
async fn streaming_redraws_are_coalesced_but_lossless() {
    // 20 chunks arriving every 5ms against a 30ms frame interval: far fewer
    // redraws than chunks, but the completed turn carries every byte.
    let chunk_count = 20usize;
    let done = TurnEvent::Done {
        turn_number: 6,
        persona: PersonaKey::A,
        is_last_turn: true,
    };
    let timed: ByteStream = Box::pin(async_stream::stream! {
        for i in 0..chunk_count {
            tokio::time::sleep(Duration::from_millis(5)).await;
            yield Ok(wire(&[TurnEvent::Chunk { content: format!("w{i} ") }]));
        }
        yield Ok(wire(&[done]));
    });

    let (transport, _) =
        ScriptedTransport::new(snapshot(DebateStatus::Ongoing, 6, 5), vec![timed]);
    let (result, updates) = run_and_collect(transport, CancellationToken::new()).await;
    assert!(result.is_ok());

    let expected_full: String = (0..chunk_count).map(|i| format!("w{i} ")).collect();

    let redraws: Vec<&String> = updates
        .iter()
        .filter_map(|u| match u {
            WatcherUpdate::StreamingText { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert!(
        redraws.len() < chunk_count,
        "expected coalescing, got {} redraws for {} chunks",
        redraws.len(),
        chunk_count
    );
    // Every redraw shows the full accumulated text so far.
    for text in &redraws {
        assert!(expected_full.starts_with(text.as_str()));
    }

    let content = updates
        .iter()
        .find_map(|u| match u {
            WatcherUpdate::TurnCompleted { content, .. } => Some(content.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(content, expected_full);
}
