//! Matchmaking queue for the roll arena service
//!
//! This module implements mutual opt-in challenge pairing between users.

pub mod challenge;

// Re-export commonly used types
pub use challenge::{ChallengeQueue, ChallengeQueueStats, JoinOutcome, QueueTicket};
