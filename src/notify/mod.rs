//! Client notification dispatch for the roll arena service
//!
//! This module delivers match lifecycle events to connected clients over
//! per-user channels, with best-effort semantics.

pub mod dispatcher;

// Re-export commonly used types
pub use dispatcher::{ChannelNotifier, MockNotifier, Notifier};
