//! Rating calculator trait and implementations
//!
//! This module defines the interface for post-duel rating adjustments and a
//! mock implementation for testing.

use serde::{Deserialize, Serialize};

/// Result of a rating calculation for one decisive duel
///
/// Both deltas are non-negative; the winner's rating increases by
/// `winner_delta` and the loser's decreases by `loser_delta`. The two values
/// are rounded independently and are not guaranteed to be equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingAdjustment {
    pub winner_delta: i32,
    pub loser_delta: i32,
}

/// Trait for calculating rating adjustments after decisive duels
pub trait RatingCalculator: Send + Sync {
    /// Calculate the rating deltas for a decisive outcome
    ///
    /// # Arguments
    /// * `winner_elo` - Winner's rating going into the duel
    /// * `loser_elo` - Loser's rating going into the duel
    fn calculate(&self, winner_elo: i32, loser_elo: i32) -> crate::error::Result<RatingAdjustment>;
}

/// Mock rating calculator for testing
#[derive(Debug, Default)]
pub struct MockRatingCalculator {
    calculation_calls: std::sync::Mutex<Vec<(i32, i32)>>,
    fixed_result: std::sync::RwLock<Option<RatingAdjustment>>,
}

impl MockRatingCalculator {
    pub fn new() -> Self {
        Self {
            calculation_calls: std::sync::Mutex::new(Vec::new()),
            fixed_result: std::sync::RwLock::new(None),
        }
    }

    /// Set a fixed adjustment to return for all calculations
    pub fn set_fixed_result(&self, result: RatingAdjustment) {
        if let Ok(mut fixed) = self.fixed_result.write() {
            *fixed = Some(result);
        }
    }

    /// Get all (winner_elo, loser_elo) calls made (for testing)
    pub fn get_calculation_calls(&self) -> Vec<(i32, i32)> {
        self.calculation_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calculation_calls.lock() {
            calls.clear();
        }
    }
}

impl RatingCalculator for MockRatingCalculator {
    fn calculate(&self, winner_elo: i32, loser_elo: i32) -> crate::error::Result<RatingAdjustment> {
        // Record the call
        if let Ok(mut calls) = self.calculation_calls.lock() {
            calls.push((winner_elo, loser_elo));
        }

        // Return fixed result if set, otherwise leave ratings unchanged
        if let Ok(fixed) = self.fixed_result.read() {
            if let Some(result) = fixed.as_ref() {
                return Ok(*result);
            }
        }

        Ok(RatingAdjustment {
            winner_delta: 0,
            loser_delta: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_calculator_records_calls() {
        let calculator = MockRatingCalculator::new();

        let result = calculator.calculate(1200, 1000).unwrap();
        assert_eq!(result.winner_delta, 0);
        assert_eq!(result.loser_delta, 0);

        let calls = calculator.get_calculation_calls();
        assert_eq!(calls, vec![(1200, 1000)]);

        calculator.clear_calls();
        assert!(calculator.get_calculation_calls().is_empty());
    }

    #[test]
    fn test_mock_calculator_fixed_result() {
        let calculator = MockRatingCalculator::new();
        calculator.set_fixed_result(RatingAdjustment {
            winner_delta: 10,
            loser_delta: 12,
        });

        let result = calculator.calculate(1000, 1000).unwrap();
        assert_eq!(result.winner_delta, 10);
        assert_eq!(result.loser_delta, 12);
    }
}
