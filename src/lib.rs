//! Roll Arena - Matchmaking and match lifecycle for head-to-head roll duels
//!
//! This crate provides mutual-challenge pairing with timed duel management,
//! Elo rating updates, and client event notification for dice roll games.

pub mod config;
pub mod duel;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod queue;
pub mod rating;
pub mod roster;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{ArenaError, Result};
pub use types::*;

// Re-export key components
pub use duel::DuelRegistry;
pub use notify::{ChannelNotifier, Notifier};
pub use queue::ChallengeQueue;
pub use roster::PlayerDirectory;
pub use storage::{ArenaStore, InMemoryArenaStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
