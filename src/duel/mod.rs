//! Duel lifecycle system for the roll arena service
//!
//! This module handles duel creation, roll tracking, timeout resolution,
//! and eviction of finished duels from memory.

pub mod instance;
pub mod registry;

// Re-export commonly used types
pub use instance::{DuelInstance, RollApplied};
pub use registry::{DuelRegistry, DuelRegistryStats};
