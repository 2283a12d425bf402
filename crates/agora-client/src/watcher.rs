//! The autonomous debate watcher
//!
//! One watcher observes one debate. After loading the snapshot it keeps
//! requesting turns on its own, with no user interaction, until the debate
//! reports its terminal turn, relaying progress to its presentation layer
//! through an update channel:
//!
//! - streaming text is coalesced to at most one update per frame interval,
//!   always carrying the full accumulated text so nothing is lost between
//!   frames
//! - a `done` event finalizes the transient text into a completed turn and
//!   re-arms the advance loop
//! - a server `error` event halts the loop and surfaces one `Failed` update
//! - cancellation (page teardown, ctrl-c) stops the watcher cleanly and is
//!   never reported as a failure

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use agora_core::wire::DebateSnapshot;
use agora_core::{DebateStatus, PersonaKey, TurnEvent};
use futures::StreamExt;

use crate::decoder::SseDecoder;
use crate::error::ClientError;
use crate::transport::DebateTransport;

/// Progress updates sent to the presentation layer
#[derive(Debug, Clone)]
pub enum WatcherUpdate {
    /// Initial state, once, before any advancement
    Snapshot(DebateSnapshot),
    /// A new turn started streaming
    SpeakerStarted { persona: PersonaKey, turn_number: u32 },
    /// Coalesced redraw: the full text streamed so far this turn
    StreamingText { persona: PersonaKey, text: String },
    /// A turn finished and is now durable history
    TurnCompleted {
        persona: PersonaKey,
        turn_number: u32,
        content: String,
        is_last_turn: bool,
    },
    /// The debate reached its terminal turn
    Completed,
    /// A genuine failure; the watcher has stopped
    Failed { message: String },
}

struct TurnOutcome {
    turn_number: u32,
    is_last_turn: bool,
}

/// Autonomous client state machine for a single debate
pub struct DebateWatcher<T> {
    transport: T,
    debate_id: Uuid,
    updates: mpsc::Sender<WatcherUpdate>,
    cancel: CancellationToken,
    frame: Duration,
    /// Reentrancy guard: at most one advancement in flight, ever
    advancing: bool,
}

impl<T: DebateTransport> DebateWatcher<T> {
    pub fn new(
        transport: T,
        debate_id: Uuid,
        updates: mpsc::Sender<WatcherUpdate>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            debate_id,
            updates,
            cancel,
            frame: Duration::from_millis(33),
            advancing: false,
        }
    }

    /// Override the redraw coalescing interval (default ~30 fps)
    pub fn with_frame_interval(mut self, frame: Duration) -> Self {
        self.frame = frame;
        self
    }

    async fn send(&self, update: WatcherUpdate) {
        // A closed receiver means the presentation layer went away; the
        // cancellation token is the proper stop signal, so just drop updates.
        let _ = self.updates.send(update).await;
    }

    /// Observe the debate to completion (or cancellation).
    ///
    /// Returns `Ok(())` on terminal state *and* on cancellation; only
    /// genuine failures return an error, after a `Failed` update.
    pub async fn run(mut self) -> Result<(), ClientError> {
        let snapshot = self.transport.snapshot(self.debate_id).await?;
        let mut status = snapshot.status;
        let mut current_turn = snapshot.current_turn;
        let total_turns = snapshot.total_turns;
        let roster = snapshot.personas.clone();

        self.send(WatcherUpdate::Snapshot(snapshot)).await;

        while status == DebateStatus::Ongoing && current_turn < total_turns {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            match self.advance_once(&roster, current_turn).await {
                Ok(Some(outcome)) => {
                    current_turn = outcome.turn_number;
                    if outcome.is_last_turn {
                        status = DebateStatus::Completed;
                    }
                }
                Ok(None) => return Ok(()), // cancelled mid-stream
                Err(e) => {
                    self.send(WatcherUpdate::Failed {
                        message: e.to_string(),
                    })
                    .await;
                    return Err(e);
                }
            }
        }

        self.send(WatcherUpdate::Completed).await;
        Ok(())
    }

    /// One guarded advancement episode. `Ok(None)` means cancelled.
    async fn advance_once(
        &mut self,
        roster: &[PersonaKey],
        current_turn: u32,
    ) -> Result<Option<TurnOutcome>, ClientError> {
        if self.advancing {
            return Err(ClientError::Stream(
                "an advancement is already in flight".to_string(),
            ));
        }
        self.advancing = true;
        let result = self.advance_inner(roster, current_turn).await;
        self.advancing = false;
        result
    }

    async fn advance_inner(
        &self,
        roster: &[PersonaKey],
        current_turn: u32,
    ) -> Result<Option<TurnOutcome>, ClientError> {
        let speaker = roster[current_turn as usize % roster.len()];
        self.send(WatcherUpdate::SpeakerStarted {
            persona: speaker,
            turn_number: current_turn + 1,
        })
        .await;

        let mut stream = self.transport.advance(self.debate_id).await?;
        let mut decoder = SseDecoder::new();
        let mut accumulated = String::new();
        let mut dirty = false;

        let mut frames = tokio::time::interval(self.frame);
        frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!(debate = %self.debate_id, "Watcher cancelled mid-turn");
                    return Ok(None);
                }
                _ = frames.tick() => {
                    if dirty {
                        self.send(WatcherUpdate::StreamingText {
                            persona: speaker,
                            text: accumulated.clone(),
                        })
                        .await;
                        dirty = false;
                    }
                }
                next = stream.next() => {
                    let Some(next) = next else {
                        return Err(ClientError::Stream(
                            "stream ended before a terminal event".to_string(),
                        ));
                    };
                    for event in decoder.push(&next?)? {
                        match event {
                            TurnEvent::Chunk { content } => {
                                accumulated.push_str(&content);
                                dirty = true;
                            }
                            TurnEvent::Done { turn_number, persona, is_last_turn } => {
                                self.send(WatcherUpdate::TurnCompleted {
                                    persona,
                                    turn_number,
                                    content: std::mem::take(&mut accumulated),
                                    is_last_turn,
                                })
                                .await;
                                return Ok(Some(TurnOutcome { turn_number, is_last_turn }));
                            }
                            TurnEvent::Error { message } => {
                                return Err(ClientError::Turn(message));
                            }
                        }
                    }
                }
            }
        }
    }
}
