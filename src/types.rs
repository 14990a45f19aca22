//! Common types used throughout the arena service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players ("ARNG-" + 8 uppercase alphanumerics)
pub type UserId = String;

/// Unique identifier for duels
pub type MatchId = Uuid;

/// Lifecycle phase of a duel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuelPhase {
    Active,
    Finished,
}

impl std::fmt::Display for DuelPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuelPhase::Active => write!(f, "active"),
            DuelPhase::Finished => write!(f, "finished"),
        }
    }
}

/// Resolved result of a finished duel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Winner(UserId),
    Draw,
}

impl MatchOutcome {
    /// Winning player's id, if the duel was decisive
    pub fn winner_id(&self) -> Option<&UserId> {
        match self {
            MatchOutcome::Winner(user_id) => Some(user_id),
            MatchOutcome::Draw => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, MatchOutcome::Draw)
    }
}

impl std::fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchOutcome::Winner(user_id) => write!(f, "{}", user_id),
            MatchOutcome::Draw => write!(f, "draw"),
        }
    }
}

/// Persisted player profile and lifetime stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub wins: u32,
    pub losses: u32,
    pub elo: i32,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(user_id: UserId, username: String, elo: i32) -> Self {
        Self {
            user_id,
            username,
            wins: 0,
            losses: 0,
            elo,
            created_at: Utc::now(),
        }
    }

    /// Win percentage over finished games, one decimal place; 0.0 with no games
    pub fn winrate_percent(&self) -> f64 {
        let games = self.wins + self.losses;
        if games == 0 {
            return 0.0;
        }
        let percent = (self.wins as f64 / games as f64) * 100.0;
        (percent * 10.0).round() / 10.0
    }
}

/// Serializable snapshot of one duel, also the persisted shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub player1_id: UserId,
    pub player2_id: UserId,
    pub player1_score: u64,
    pub player2_score: u64,
    pub outcome: Option<MatchOutcome>,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub phase: DuelPhase,
}

impl MatchRecord {
    /// Whether the given user is one of the two participants
    pub fn involves(&self, user_id: &str) -> bool {
        self.player1_id == user_id || self.player2_id == user_id
    }

    pub fn is_finished(&self) -> bool {
        self.phase == DuelPhase::Finished
    }
}

/// One row of the public leaderboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user_id: UserId,
    pub username: String,
    pub wins: u32,
    pub losses: u32,
    pub elo: i32,
    pub winrate: f64,
}

impl From<&UserRecord> for LeaderboardRow {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            wins: user.wins,
            losses: user.losses,
            elo: user.elo,
            winrate: user.winrate_percent(),
        }
    }
}

/// Union type for all events pushed to connected clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A mutual challenge completed; both players receive their opponent's id
    MatchFound { match_id: MatchId, opponent: UserId },
    /// The opponent submitted a roll; carries the raw submitted value
    OpponentRoll { score: u64 },
    /// The duel resolved; carries the full final record
    MatchEnd { summary: MatchRecord },
}

impl ClientEvent {
    /// Stable event name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::MatchFound { .. } => "match_found",
            ClientEvent::OpponentRoll { .. } => "opponent_roll",
            ClientEvent::MatchEnd { .. } => "match_end",
        }
    }
}
