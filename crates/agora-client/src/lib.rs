//! # Agora Client
//!
//! The spectator side of the debate arena:
//!
//! - [`SseDecoder`] turns an arbitrarily-chunked byte stream back into
//!   discrete turn events
//! - [`DebateTransport`] is the seam to the server (HTTP in production,
//!   scripted byte streams in tests)
//! - [`DebateWatcher`] is the autonomous state machine: it loads a snapshot,
//!   keeps requesting turns until the debate completes, coalesces streaming
//!   redraws to a frame cadence, and treats cancellation as a clean stop
//!   rather than an error.

pub mod decoder;
pub mod error;
pub mod transport;
pub mod watcher;

pub use decoder::SseDecoder;
pub use error::ClientError;
pub use transport::{ByteStream, DebateTransport, HttpTransport};
pub use watcher::{DebateWatcher, WatcherUpdate};
