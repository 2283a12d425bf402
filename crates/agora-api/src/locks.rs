//! Per-debate advancement locks
//!
//! Nothing else stops two concurrent advancement requests for the same
//! debate from both passing the precondition check and computing the same
//! turn number. This registry guarantees at most one in-flight advancement
//! per debate: the handler acquires the debate's lock with `try_acquire`
//! before any generation call and holds the owned guard until its event
//! stream closes. The loser of a race is rejected immediately rather than
//! queued, so a spectator reconnecting mid-turn gets a clean conflict
//! instead of a surprise second generation.
//!
//! The storage layer's `UNIQUE (debate_uuid, turn_number)` constraint
//! backstops anything that slips past this registry.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-debate advancement locks
#[derive(Debug, Default)]
pub struct TurnLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the advancement lock for a debate.
    ///
    /// Returns `None` when an advancement for this debate is already in
    /// flight. The returned guard keeps the lock until dropped, across
    /// await points and stream lifetimes.
    pub async fn try_acquire(&self, debate: Uuid) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(debate)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.try_lock_owned().ok()
    }
}
