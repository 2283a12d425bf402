//! # Agora Persistence
//!
//! SQLite storage for debates, messages, and votes.
//!
//! Schema invariants enforced here rather than in handler code:
//! - `UNIQUE (debate_uuid, turn_number)`: the backstop against two racing
//!   advancements persisting the same turn
//! - `UNIQUE (debate_uuid, voter_ip)`: one vote per fingerprint per debate
//! - `ON DELETE CASCADE`: a debate exclusively owns its dependents
//!
//! The message insert and the terminal status flip commit in a single
//! transaction; a debate can never hold its final message while still
//! reading `ongoing`.

pub mod error;
pub mod sqlite;
pub mod store;

pub use error::StorageError;
pub use sqlite::{SqliteBackend, SqliteConfig};
pub use store::{DebateRecord, DebateStore, MessageRecord, VoteRecord};
