//! Rating system integration using the Elo algorithm
//!
//! This module provides rating calculations for decisive duel outcomes,
//! backed by the skillratings crate.

pub mod calculator;
pub mod elo;

// Re-export commonly used types
pub use calculator::{MockRatingCalculator, RatingAdjustment, RatingCalculator};
pub use elo::EloRatingCalculator;
