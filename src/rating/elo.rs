//! Elo rating system implementation
//!
//! This module provides the concrete rating calculator for duels, using the
//! Elo expected-score function from the skillratings crate with a fixed
//! K-factor.

use crate::config::RatingSettings;
use crate::error::ArenaError;
use crate::rating::calculator::{RatingAdjustment, RatingCalculator};
use skillratings::elo::{expected_score, EloRating};

/// Elo rating calculator for two-player duels
///
/// Winner delta = round(K * (1 - E)), loser delta = round(K * E), where E is
/// the winner's expected score. Each side is rounded on its own, so the two
/// deltas can differ by one point after rounding. That asymmetry is carried
/// through unchanged.
#[derive(Debug, Clone)]
pub struct EloRatingCalculator {
    settings: RatingSettings,
}

impl EloRatingCalculator {
    /// Create a new Elo calculator, validating the settings
    pub fn new(settings: RatingSettings) -> crate::error::Result<Self> {
        if settings.k_factor <= 0.0 {
            return Err(ArenaError::ConfigurationError {
                message: "K-factor must be positive".to_string(),
            }
            .into());
        }
        if settings.starting_elo <= 0 {
            return Err(ArenaError::ConfigurationError {
                message: "Starting elo must be positive".to_string(),
            }
            .into());
        }

        Ok(Self { settings })
    }

    /// K-factor in use
    pub fn k_factor(&self) -> f64 {
        self.settings.k_factor
    }

    /// Rating assigned to new players
    pub fn starting_elo(&self) -> i32 {
        self.settings.starting_elo
    }

    /// Expected score for the first player: 1 / (1 + 10^((r2 - r1) / 400))
    pub fn expected_win_probability(&self, player_elo: i32, opponent_elo: i32) -> f64 {
        let player = EloRating {
            rating: player_elo as f64,
        };
        let opponent = EloRating {
            rating: opponent_elo as f64,
        };
        let (expected, _) = expected_score(&player, &opponent);
        expected
    }
}

impl Default for EloRatingCalculator {
    fn default() -> Self {
        Self {
            settings: RatingSettings::default(),
        }
    }
}

impl RatingCalculator for EloRatingCalculator {
    fn calculate(&self, winner_elo: i32, loser_elo: i32) -> crate::error::Result<RatingAdjustment> {
        let expected_win = self.expected_win_probability(winner_elo, loser_elo);

        if !expected_win.is_finite() {
            return Err(ArenaError::RatingCalculationFailed {
                reason: format!(
                    "Non-finite expected score for ratings {} vs {}",
                    winner_elo, loser_elo
                ),
            }
            .into());
        }

        let winner_delta = (self.settings.k_factor * (1.0 - expected_win)).round() as i32;
        let loser_delta = (self.settings.k_factor * expected_win).round() as i32;

        Ok(RatingAdjustment {
            winner_delta,
            loser_delta,
        })
    }
}
