//! Configuration management for the roll-arena service
//!
//! This module handles all configuration loading from environment variables,
//! validation, and default values for the arena service.

pub mod app;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ArenaSettings, RatingSettings, ServiceSettings};
