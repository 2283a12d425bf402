//! Application State
//!
//! Centralizes access to the store, the generation provider, and the
//! per-debate turn locks. The SQLite pool behind the store is the single
//! shared connection handle, created once at startup and injected here.

use std::sync::Arc;

use agora_llm::LlmProvider;
use agora_persist::{DebateStore, SqliteBackend};

use crate::locks::TurnLocks;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    db: SqliteBackend,
    store: DebateStore,
    llm: Arc<dyn LlmProvider>,
    turn_locks: Arc<TurnLocks>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqliteBackend, llm: Arc<dyn LlmProvider>) -> Self {
        let store = DebateStore::new(db.pool().clone());
        Self {
            db,
            store,
            llm,
            turn_locks: Arc::new(TurnLocks::new()),
        }
    }

    /// Get the storage backend
    pub fn db(&self) -> &SqliteBackend {
        &self.db
    }

    /// Get the debate store
    pub fn store(&self) -> &DebateStore {
        &self.store
    }

    /// Get the generation provider (cloned Arc for sharing)
    pub fn llm(&self) -> Arc<dyn LlmProvider> {
        self.llm.clone()
    }

    /// Get the per-debate turn-lock registry
    pub fn turn_locks(&self) -> Arc<TurnLocks> {
        self.turn_locks.clone()
    }
}
