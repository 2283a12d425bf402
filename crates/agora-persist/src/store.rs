//! Debate store: typed access to debates, messages, and votes

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use agora_core::{DebateStatus, PersonaKey, ROSTER_SIZE};

use crate::error::StorageError;

/// A persisted debate
#[derive(Debug, Clone)]
pub struct DebateRecord {
    pub debate_uuid: Uuid,
    pub topic: String,
    pub status: DebateStatus,
    pub total_turns: u32,
    /// Speaking order, fixed at creation
    pub roster: [PersonaKey; ROSTER_SIZE],
    pub created_at: DateTime<Utc>,
}

/// A persisted debate turn. Immutable once created.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub message_uuid: Uuid,
    pub debate_uuid: Uuid,
    pub persona: PersonaKey,
    pub content: String,
    pub turn_number: u32,
    pub created_at: DateTime<Utc>,
}

/// A persisted audience vote. Immutable once created.
#[derive(Debug, Clone)]
pub struct VoteRecord {
    pub vote_uuid: Uuid,
    pub debate_uuid: Uuid,
    pub persona: PersonaKey,
    pub voter_ip: String,
    pub created_at: DateTime<Utc>,
}

/// Store for the debate aggregate (debate + messages + votes)
#[derive(Debug, Clone)]
pub struct DebateStore {
    pool: SqlitePool,
}

fn parse_uuid(s: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(s).map_err(|e| StorageError::Serialization(format!("bad uuid: {e}")))
}

fn parse_persona(s: &str) -> Result<PersonaKey, StorageError> {
    s.parse()
        .map_err(|_| StorageError::Serialization(format!("bad persona key: {s}")))
}

fn parse_roster(json: &str) -> Result<[PersonaKey; ROSTER_SIZE], StorageError> {
    let keys: Vec<PersonaKey> = serde_json::from_str(json)
        .map_err(|e| StorageError::Serialization(format!("bad roster: {e}")))?;
    keys.try_into()
        .map_err(|_| StorageError::Serialization("roster is not exactly 3 personas".to_string()))
}

fn debate_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DebateRecord, StorageError> {
    let uuid: String = row
        .try_get("debate_uuid")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let roster: String = row
        .try_get("roster")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let total_turns: i64 = row
        .try_get("total_turns")
        .map_err(|e| StorageError::Query(e.to_string()))?;

    Ok(DebateRecord {
        debate_uuid: parse_uuid(&uuid)?,
        topic: row
            .try_get("topic")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        status: status
            .parse()
            .map_err(|e| StorageError::Serialization(format!("{e}")))?,
        total_turns: total_turns as u32,
        roster: parse_roster(&roster)?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| StorageError::Query(e.to_string()))?,
    })
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<MessageRecord, StorageError> {
    let message_uuid: String = row
        .try_get("message_uuid")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let debate_uuid: String = row
        .try_get("debate_uuid")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let persona: String = row
        .try_get("persona")
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let turn_number: i64 = row
        .try_get("turn_number")
        .map_err(|e| StorageError::Query(e.to_string()))?;

    Ok(MessageRecord {
        message_uuid: parse_uuid(&message_uuid)?,
        debate_uuid: parse_uuid(&debate_uuid)?,
        persona: parse_persona(&persona)?,
        content: row
            .try_get("content")
            .map_err(|e| StorageError::Query(e.to_string()))?,
        turn_number: turn_number as u32,
        created_at: row
            .try_get("created_at")
            .map_err(|e| StorageError::Query(e.to_string()))?,
    })
}

impl DebateStore {
    /// Create a store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new debate with status `ongoing`
    pub async fn create_debate(
        &self,
        topic: &str,
        total_turns: u32,
        roster: [PersonaKey; ROSTER_SIZE],
    ) -> Result<DebateRecord, StorageError> {
        let record = DebateRecord {
            debate_uuid: Uuid::new_v4(),
            topic: topic.to_string(),
            status: DebateStatus::Ongoing,
            total_turns,
            roster,
            created_at: Utc::now(),
        };

        let roster_json = serde_json::to_string(&record.roster.to_vec())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        sqlx::query(
            "INSERT INTO debates (debate_uuid, topic, status, total_turns, roster, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.debate_uuid.to_string())
        .bind(&record.topic)
        .bind(record.status.as_str())
        .bind(record.total_turns as i64)
        .bind(roster_json)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(record)
    }

    /// Fetch a debate by id
    pub async fn fetch_debate(&self, id: Uuid) -> Result<Option<DebateRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT debate_uuid, topic, status, total_turns, roster, created_at \
             FROM debates WHERE debate_uuid = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(debate_from_row).transpose()
    }

    /// Fetch all messages of a debate, ordered by turn number
    pub async fn fetch_messages(&self, id: Uuid) -> Result<Vec<MessageRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT message_uuid, debate_uuid, persona, content, turn_number, created_at \
             FROM messages WHERE debate_uuid = ? ORDER BY turn_number ASC",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(message_from_row).collect()
    }

    /// Count persisted messages of a debate (= completed turns)
    pub async fn message_count(&self, id: Uuid) -> Result<u32, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM messages WHERE debate_uuid = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(n as u32)
    }

    /// Persist one finished turn, flipping the debate to `completed` in the
    /// same transaction when it is the last one.
    ///
    /// A duplicate turn number (two advancements racing) hits the
    /// `UNIQUE (debate_uuid, turn_number)` constraint and surfaces as
    /// `AlreadyExists`; nothing is committed in that case.
    pub async fn append_turn(
        &self,
        debate_uuid: Uuid,
        persona: PersonaKey,
        content: &str,
        turn_number: u32,
        mark_completed: bool,
    ) -> Result<MessageRecord, StorageError> {
        let record = MessageRecord {
            message_uuid: Uuid::new_v4(),
            debate_uuid,
            persona,
            content: content.to_string(),
            turn_number,
            created_at: Utc::now(),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO messages (message_uuid, debate_uuid, persona, content, turn_number, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.message_uuid.to_string())
        .bind(record.debate_uuid.to_string())
        .bind(record.persona.as_str())
        .bind(&record.content)
        .bind(record.turn_number as i64)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::from_sqlx(e, &format!("turn {turn_number}")))?;

        if mark_completed {
            let result = sqlx::query(
                "UPDATE debates SET status = 'completed' \
                 WHERE debate_uuid = ? AND status = 'ongoing'",
            )
            .bind(record.debate_uuid.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

            if result.rows_affected() != 1 {
                // Debate vanished or was already completed; abort the turn too.
                return Err(StorageError::Internal(
                    "terminal status flip affected no ongoing debate".to_string(),
                ));
            }
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(record)
    }

    /// Insert one vote. A second vote from the same fingerprint hits the
    /// `UNIQUE (debate_uuid, voter_ip)` constraint and surfaces as
    /// `AlreadyExists`.
    pub async fn insert_vote(
        &self,
        debate_uuid: Uuid,
        persona: PersonaKey,
        voter_ip: &str,
    ) -> Result<VoteRecord, StorageError> {
        let record = VoteRecord {
            vote_uuid: Uuid::new_v4(),
            debate_uuid,
            persona,
            voter_ip: voter_ip.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO votes (vote_uuid, debate_uuid, persona, voter_ip, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.vote_uuid.to_string())
        .bind(record.debate_uuid.to_string())
        .bind(record.persona.as_str())
        .bind(&record.voter_ip)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::from_sqlx(e, &format!("vote by {voter_ip}")))?;

        Ok(record)
    }

    /// Tally votes per persona for a debate
    pub async fn vote_counts(
        &self,
        debate_uuid: Uuid,
    ) -> Result<Vec<(PersonaKey, u64)>, StorageError> {
        let rows = sqlx::query(
            "SELECT persona, COUNT(*) AS n FROM votes WHERE debate_uuid = ? GROUP BY persona",
        )
        .bind(debate_uuid.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let persona: String = row
                .try_get("persona")
                .map_err(|e| StorageError::Query(e.to_string()))?;
            let n: i64 = row
                .try_get("n")
                .map_err(|e| StorageError::Query(e.to_string()))?;
            counts.push((parse_persona(&persona)?, n as u64));
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteBackend;

    const ROSTER: [PersonaKey; 3] = [PersonaKey::A, PersonaKey::D, PersonaKey::G];

    async fn store() -> DebateStore {
        let backend = SqliteBackend::memory().await.unwrap();
        DebateStore::new(backend.pool().clone())
    }

    #[tokio::test]
    async fn create_and_fetch_round_trips() {
        let store = store().await;
        let created = store.create_debate("test topic", 6, ROSTER).await.unwrap();

        let fetched = store
            .fetch_debate(created.debate_uuid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.topic, "test topic");
        assert_eq!(fetched.status, DebateStatus::Ongoing);
        assert_eq!(fetched.total_turns, 6);
        assert_eq!(fetched.roster, ROSTER);

        assert!(store.fetch_debate(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_turn_keeps_turns_contiguous() {
        let store = store().await;
        let debate = store.create_debate("topic", 6, ROSTER).await.unwrap();

        store
            .append_turn(debate.debate_uuid, PersonaKey::A, "first", 1, false)
            .await
            .unwrap();
        store
            .append_turn(debate.debate_uuid, PersonaKey::D, "second", 2, false)
            .await
            .unwrap();

        assert_eq!(store.message_count(debate.debate_uuid).await.unwrap(), 2);
        let messages = store.fetch_messages(debate.debate_uuid).await.unwrap();
        let turns: Vec<u32> = messages.iter().map(|m| m.turn_number).collect();
        assert_eq!(turns, vec![1, 2]);
    }

    #[tokio::test]
    async fn duplicate_turn_number_is_a_conflict_and_rolls_back() {
        let store = store().await;
        let debate = store.create_debate("topic", 6, ROSTER).await.unwrap();

        store
            .append_turn(debate.debate_uuid, PersonaKey::A, "first", 1, false)
            .await
            .unwrap();

        // A racing writer computing the same turn loses to the constraint,
        // even when it believed the turn was terminal.
        let err = store
            .append_turn(debate.debate_uuid, PersonaKey::D, "dup", 1, true)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        assert_eq!(store.message_count(debate.debate_uuid).await.unwrap(), 1);
        let fetched = store
            .fetch_debate(debate.debate_uuid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.status, DebateStatus::Ongoing);
    }

    #[tokio::test]
    async fn last_turn_flips_status_in_same_transaction() {
        let store = store().await;
        let debate = store.create_debate("topic", 6, ROSTER).await.unwrap();

        for turn in 1..=5u32 {
            store
                .append_turn(debate.debate_uuid, ROSTER[(turn as usize - 1) % 3], "x", turn, false)
                .await
                .unwrap();
        }
        store
            .append_turn(debate.debate_uuid, ROSTER[2], "final", 6, true)
            .await
            .unwrap();

        let fetched = store
            .fetch_debate(debate.debate_uuid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.status, DebateStatus::Completed);
        assert_eq!(store.message_count(debate.debate_uuid).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn votes_are_unique_per_fingerprint() {
        let store = store().await;
        let debate = store.create_debate("topic", 6, ROSTER).await.unwrap();

        store
            .insert_vote(debate.debate_uuid, PersonaKey::A, "1.2.3.4")
            .await
            .unwrap();

        let err = store
            .insert_vote(debate.debate_uuid, PersonaKey::D, "1.2.3.4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        store
            .insert_vote(debate.debate_uuid, PersonaKey::A, "5.6.7.8")
            .await
            .unwrap();

        let counts = store.vote_counts(debate.debate_uuid).await.unwrap();
        assert_eq!(counts, vec![(PersonaKey::A, 2)]);
    }
}
