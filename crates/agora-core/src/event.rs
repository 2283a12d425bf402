//! Turn-advancement stream events
//!
//! One advancement produces an ordered stream of these events over SSE:
//! zero or more `chunk`s, then exactly one terminal `done` or `error`.
//! The JSON field names here are the wire format and must not drift.

use serde::{Deserialize, Serialize};

use crate::persona::PersonaKey;

/// A single event on the turn-advancement stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TurnEvent {
    /// One incremental fragment of generated text, relayed as it arrives.
    Chunk { content: String },
    /// The turn finished and was persisted. Always the last event of a
    /// successful stream, strictly after all of the turn's chunks.
    #[serde(rename_all = "camelCase")]
    Done {
        turn_number: u32,
        persona: PersonaKey,
        is_last_turn: bool,
    },
    /// Generation or persistence failed; the stream closes after this and
    /// nothing was persisted.
    Error { message: String },
}

impl TurnEvent {
    /// Whether this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnEvent::Done { .. } | TurnEvent::Error { .. })
    }
}
