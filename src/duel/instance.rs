//! Duel instance implementation and lifecycle management
//!
//! This module contains the core duel logic for tracking scores,
//! deciding outcomes, and the active-to-finished transition.

use crate::error::{ArenaError, Result};
use crate::types::{DuelPhase, MatchId, MatchOutcome, MatchRecord, UserId};
use chrono::{DateTime, Duration, Utc};

/// Score pair and opponent routing for an accepted roll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollApplied {
    pub opponent_id: UserId,
    pub player1_score: u64,
    pub player2_score: u64,
}

/// Concrete implementation of a duel instance
///
/// A duel is created active with a fixed deadline and finishes exactly
/// once. Scores only move upward; a roll below a player's current best
/// is accepted but changes nothing.
#[derive(Debug, Clone)]
pub struct DuelInstance {
    match_id: MatchId,
    player1_id: UserId,
    player2_id: UserId,
    player1_score: u64,
    player2_score: u64,
    outcome: Option<MatchOutcome>,
    started_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    phase: DuelPhase,
}

impl DuelInstance {
    /// Create a new active duel between two players
    pub fn new(
        match_id: MatchId,
        player1_id: UserId,
        player2_id: UserId,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            match_id,
            player1_id,
            player2_id,
            player1_score: 0,
            player2_score: 0,
            outcome: None,
            started_at,
            deadline: started_at + duration,
            ended_at: None,
            phase: DuelPhase::Active,
        }
    }

    /// Get duel ID
    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    /// Get current phase
    pub fn phase(&self) -> DuelPhase {
        self.phase
    }

    /// Whether the duel is still accepting rolls
    pub fn is_active(&self) -> bool {
        self.phase == DuelPhase::Active
    }

    /// Get the resolution deadline
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Get current score pair
    pub fn scores(&self) -> (u64, u64) {
        (self.player1_score, self.player2_score)
    }

    /// Whether a user plays in this duel
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.player1_id == user_id || self.player2_id == user_id
    }

    /// The other player's id, if the given user plays in this duel
    pub fn opponent_of(&self, user_id: &str) -> Option<&UserId> {
        if self.player1_id == user_id {
            Some(&self.player2_id)
        } else if self.player2_id == user_id {
            Some(&self.player1_id)
        } else {
            None
        }
    }

    /// Move deadline (for testing)
    #[cfg(test)]
    pub fn set_deadline(&mut self, deadline: DateTime<Utc>) {
        self.deadline = deadline;
    }

    /// Apply a roll from a participant
    ///
    /// Returns `None` when the duel is no longer active or the user is not
    /// a participant. Both cases are ignored rather than treated as errors.
    pub fn record_roll(&mut self, user_id: &str, score: u64) -> Option<RollApplied> {
        if self.phase != DuelPhase::Active {
            return None;
        }

        let opponent_id = if self.player1_id == user_id {
            self.player1_score = self.player1_score.max(score);
            self.player2_id.clone()
        } else if self.player2_id == user_id {
            self.player2_score = self.player2_score.max(score);
            self.player1_id.clone()
        } else {
            return None;
        };

        Some(RollApplied {
            opponent_id,
            player1_score: self.player1_score,
            player2_score: self.player2_score,
        })
    }

    /// Whether the deadline has passed for a still-active duel
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.phase == DuelPhase::Active && now >= self.deadline
    }

    /// Whether this finished duel has outlived its retention window
    pub fn should_evict(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        match (self.phase, self.ended_at) {
            (DuelPhase::Finished, Some(ended_at)) => now - ended_at >= retention,
            _ => false,
        }
    }

    /// Decide the outcome from the current score pair
    pub fn decide_outcome(&self) -> MatchOutcome {
        if self.player1_score > self.player2_score {
            MatchOutcome::Winner(self.player1_id.clone())
        } else if self.player2_score > self.player1_score {
            MatchOutcome::Winner(self.player2_id.clone())
        } else {
            MatchOutcome::Draw
        }
    }

    /// Transition the duel to finished with the given outcome
    pub fn finish(&mut self, outcome: MatchOutcome, ended_at: DateTime<Utc>) -> Result<()> {
        if self.phase != DuelPhase::Active {
            return Err(ArenaError::InternalError {
                message: format!("Duel {} is already finished", self.match_id),
            }
            .into());
        }

        self.outcome = Some(outcome);
        self.ended_at = Some(ended_at);
        self.phase = DuelPhase::Finished;
        Ok(())
    }

    /// Snapshot the duel as a persistable match record
    pub fn to_record(&self) -> MatchRecord {
        MatchRecord {
            match_id: self.match_id,
            player1_id: self.player1_id.clone(),
            player2_id: self.player2_id.clone(),
            player1_score: self.player1_score,
            player2_score: self.player2_score,
            outcome: self.outcome.clone(),
            started_at: self.started_at,
            deadline: self.deadline,
            ended_at: self.ended_at,
            phase: self.phase,
        }
    }
}
