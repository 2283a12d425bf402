//! # Agora Core
//!
//! Domain types and pure logic for the Agora debate arena:
//!
//! - the fixed persona registry and per-debate roster sampling
//! - the turn sequencer (who speaks next, which turn, is it the last)
//! - the prompt composer for debate turns and post-debate summaries
//! - the SSE event types shared by server and spectator client
//! - the wire DTOs for the HTTP API
//!
//! Everything in this crate is side-effect free; IO lives in the sibling
//! crates (`agora-llm`, `agora-persist`, `agora-api`, `agora-client`).

pub mod debate;
pub mod event;
pub mod persona;
pub mod prompt;
pub mod wire;

pub use debate::{plan_turn, DebateStatus, StatusParseError, TurnPlan, VALID_TOTAL_TURNS};
pub use event::TurnEvent;
pub use persona::{persona, sample_roster, Persona, PersonaKey, ROSTER_SIZE};
pub use prompt::{compose_summary_prompt, compose_turn_prompt, strip_code_fences};
