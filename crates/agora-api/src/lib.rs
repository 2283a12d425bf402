//! # Agora API
//!
//! The HTTP surface of the debate arena:
//!
//! - `POST /api/debate/start`: create a debate, sample its roster
//! - `GET  /api/debate/{id}`: snapshot (topic, status, roster, history)
//! - `POST /api/debate/{id}/next`: advance one turn, streamed over SSE
//! - `GET  /api/debate/{id}/summary`: per-persona summary of a finished debate
//! - `POST /api/debate/{id}/vote`: audience vote with fingerprint dedup
//! - `GET  /api/personas`: the static persona registry
//! - `GET  /health`, `GET /health/detailed`: liveness probes
//! - `GET  /api-docs/openapi.json`: OpenAPI document
//!
//! The advancement endpoint is the interesting one: it validates lifecycle
//! preconditions before a stream is opened, holds a per-debate lock for the
//! duration of generation, relays model chunks as they arrive, and persists
//! exactly one message (plus, on the final turn, the terminal status flip)
//! in a single transaction before emitting the `done` event.

pub mod advance;
pub mod error;
pub mod locks;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::{init_tracing, AgoraServer, ServerConfig};
pub use state::AppState;
