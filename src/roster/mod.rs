//! User-facing directory for the roll arena service
//!
//! This module covers account registration, profile reads, renames,
//! and the leaderboard and match history views.

pub mod directory;

// Re-export commonly used types
pub use directory::PlayerDirectory;
