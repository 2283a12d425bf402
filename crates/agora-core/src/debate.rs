//! Debate lifecycle and the turn sequencer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::persona::{PersonaKey, ROSTER_SIZE};

/// Turn budgets a debate may be created with.
///
/// The prompt composer always includes the full history verbatim, so prompt
/// size grows linearly with turn count; this closed set is what bounds it.
pub const VALID_TOTAL_TURNS: [u32; 3] = [6, 9, 12];

/// Lifecycle of a debate. Transitions `Ongoing -> Completed` exactly once,
/// when the persisted message count reaches the configured turn budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DebateStatus {
    Ongoing,
    Completed,
}

impl DebateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebateStatus::Ongoing => "ongoing",
            DebateStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for DebateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown debate status: {0}")]
pub struct StatusParseError(String);

impl FromStr for DebateStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ongoing" => Ok(DebateStatus::Ongoing),
            "completed" => Ok(DebateStatus::Completed),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// The sequencer's answer for one advancement: who speaks, which turn number
/// the resulting message gets, and whether it exhausts the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnPlan {
    pub speaker: PersonaKey,
    pub turn_number: u32,
    pub is_last_turn: bool,
}

/// Decide the next turn from the persisted message count.
///
/// Pure and total: the same `persisted_count` always yields the same plan,
/// which is what makes the sequencing layer safe under request replay. The
/// caller is responsible for checking `persisted_count < total_turns` before
/// asking; persistence guards against duplicate turns (unique turn numbers),
/// not this function.
pub fn plan_turn(
    persisted_count: u32,
    roster: &[PersonaKey; ROSTER_SIZE],
    total_turns: u32,
) -> TurnPlan {
    let speaker = roster[persisted_count as usize % ROSTER_SIZE];
    let turn_number = persisted_count + 1;
    TurnPlan {
        speaker,
        turn_number,
        is_last_turn: turn_number >= total_turns,
    }
}
