//! Persistence layer for users and match records
//!
//! This module provides the storage interface the arena writes through,
//! plus the in-memory implementation used by the service and tests.

pub mod store;

// Re-export commonly used types
pub use store::{ArenaStore, InMemoryArenaStore, MockArenaStore, StoreCall};
