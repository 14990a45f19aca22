//! Duel registry implementation for handling multiple duel instances
//!
//! This module provides the core DuelRegistry that orchestrates duel
//! creation, roll application, resolution, and memory cleanup.

use crate::config::ArenaSettings;
use crate::duel::instance::DuelInstance;
use crate::error::{ArenaError, Result};
use crate::metrics::MetricsCollector;
use crate::notify::Notifier;
use crate::rating::RatingCalculator;
use crate::storage::ArenaStore;
use crate::types::{ClientEvent, MatchId, MatchOutcome, MatchRecord, UserId};
use crate::utils::{current_timestamp, generate_match_id};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};

/// Statistics about duel registry operations
#[derive(Debug, Clone, Default)]
pub struct DuelRegistryStats {
    /// Total number of duels created
    pub duels_created: u64,
    /// Total number of rolls applied to an active duel
    pub rolls_recorded: u64,
    /// Total number of rolls ignored (unknown duel, finished duel, outsider)
    pub rolls_ignored: u64,
    /// Total number of duels resolved
    pub duels_resolved: u64,
    /// Total number of duels that ended in a draw
    pub duels_drawn: u64,
    /// Total number of duels resolved by the timeout sweep
    pub duels_timed_out: u64,
    /// Total number of finished duels evicted from memory
    pub duels_evicted: u64,
    /// Current number of active duels in memory
    pub active_duels: usize,
    /// Current number of finished duels retained in memory
    pub finished_retained: usize,
}

/// The main duel registry
///
/// The in-memory table is the authority for active duels. Persistence and
/// notifications happen after each in-memory transition, in a fixed order,
/// and are never rolled back when a later step fails.
#[derive(Clone)]
pub struct DuelRegistry {
    /// Map of duels currently held in memory, by ID
    duels: Arc<RwLock<HashMap<MatchId, DuelInstance>>>,
    /// Store for user and match persistence
    store: Arc<dyn ArenaStore>,
    /// Notifier for client-facing events
    notifier: Arc<dyn Notifier>,
    /// Rating calculator for decisive outcomes
    rating_calculator: Arc<dyn RatingCalculator>,
    /// Arena timing and limit settings
    settings: ArenaSettings,
    /// Registry statistics
    stats: Arc<RwLock<DuelRegistryStats>>,
    /// Metrics collector for recording performance data
    metrics_collector: Arc<MetricsCollector>,
}

impl DuelRegistry {
    /// Create a new duel registry
    pub fn new(
        store: Arc<dyn ArenaStore>,
        notifier: Arc<dyn Notifier>,
        rating_calculator: Arc<dyn RatingCalculator>,
        settings: ArenaSettings,
    ) -> Self {
        // Create a default metrics collector if none provided
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_metrics(store, notifier, rating_calculator, settings, metrics_collector)
    }

    /// Create a new duel registry with metrics collector
    pub fn with_metrics(
        store: Arc<dyn ArenaStore>,
        notifier: Arc<dyn Notifier>,
        rating_calculator: Arc<dyn RatingCalculator>,
        settings: ArenaSettings,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            duels: Arc::new(RwLock::new(HashMap::new())),
            store,
            notifier,
            rating_calculator,
            settings,
            stats: Arc::new(RwLock::new(DuelRegistryStats::default())),
            metrics_collector,
        }
    }

    /// Create a new active duel between two players
    ///
    /// The duel is live in memory as soon as this returns; persisting the
    /// initial record happens afterwards and a failure there surfaces to
    /// the caller without undoing the in-memory duel.
    pub async fn create_duel(
        &self,
        player1_id: UserId,
        player2_id: UserId,
    ) -> Result<MatchRecord> {
        let match_id = generate_match_id();
        let now = current_timestamp();
        let duration = Duration::milliseconds(self.settings.match_duration_ms as i64);

        let duel = DuelInstance::new(match_id, player1_id, player2_id, now, duration);
        let record = duel.to_record();

        {
            let mut duels = self
                .duels
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire duels lock".to_string(),
                })?;
            duels.insert(match_id, duel);
        }

        {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.duels_created += 1;
        }
        self.refresh_population_stats()?;
        self.metrics_collector.record_duel_created();

        info!(
            "Created duel {} - '{}' vs '{}', deadline: {}",
            match_id, record.player1_id, record.player2_id, record.deadline
        );

        self.store.create_match(&record).await?;

        Ok(record)
    }

    /// Apply a roll from a participant to a duel
    ///
    /// A roll against an unknown duel, a finished duel, or from a user who
    /// is not a participant is ignored and still reports success.
    pub async fn submit_roll(&self, match_id: &MatchId, user_id: &str, score: u64) -> Result<()> {
        let applied = {
            let mut duels = self
                .duels
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire duels lock".to_string(),
                })?;

            match duels.get_mut(match_id) {
                Some(duel) => duel.record_roll(user_id, score),
                None => {
                    debug!("Roll for unknown duel {} from '{}' ignored", match_id, user_id);
                    None
                }
            }
        };

        match applied {
            Some(applied) => {
                {
                    let mut stats = self
                        .stats
                        .write()
                        .map_err(|_| ArenaError::InternalError {
                            message: "Failed to acquire stats lock".to_string(),
                        })?;
                    stats.rolls_recorded += 1;
                }
                self.metrics_collector.record_roll(true);

                debug!(
                    "Roll of {} by '{}' in duel {} - scores now {}:{}",
                    score, user_id, match_id, applied.player1_score, applied.player2_score
                );

                self.store
                    .update_match_score(match_id, applied.player1_score, applied.player2_score)
                    .await?;

                // The opponent sees the submitted value, not the best score
                let delivered = self
                    .notifier
                    .notify(&applied.opponent_id, ClientEvent::OpponentRoll { score })
                    .await;
                self.metrics_collector
                    .record_notification("opponent_roll", delivered);
            }
            None => {
                {
                    let mut stats = self
                        .stats
                        .write()
                        .map_err(|_| ArenaError::InternalError {
                            message: "Failed to acquire stats lock".to_string(),
                        })?;
                    stats.rolls_ignored += 1;
                }
                self.metrics_collector.record_roll(false);
            }
        }

        Ok(())
    }

    /// Resolve a duel from its current score pair
    ///
    /// Returns the finished record, or `None` when the duel is unknown or
    /// already resolved. Only one caller ever gets the record back; the
    /// timeout sweep and eager status reads both funnel through here.
    pub async fn resolve(&self, match_id: &MatchId) -> Result<Option<MatchRecord>> {
        let finished = {
            let mut duels = self
                .duels
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire duels lock".to_string(),
                })?;

            match duels.get_mut(match_id) {
                Some(duel) if duel.is_active() => {
                    let outcome = duel.decide_outcome();
                    let ended_at = current_timestamp();
                    duel.finish(outcome.clone(), ended_at)?;
                    Some((duel.to_record(), outcome, ended_at))
                }
                _ => None,
            }
        };

        let (record, outcome, ended_at) = match finished {
            Some(finished) => finished,
            None => return Ok(None),
        };

        {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.duels_resolved += 1;
            if outcome.is_draw() {
                stats.duels_drawn += 1;
            }
        }
        self.refresh_population_stats()?;

        info!(
            "Duel {} resolved - outcome: {}, scores: {}:{}",
            match_id, outcome, record.player1_score, record.player2_score
        );

        // Rating and win/loss updates come first, then the match close,
        // then notifications. A draw touches no user records.
        match &outcome {
            MatchOutcome::Winner(winner_id) => {
                let loser_id = if record.player1_id == *winner_id {
                    record.player2_id.clone()
                } else {
                    record.player1_id.clone()
                };
                self.apply_rating_updates(winner_id, &loser_id).await?;
            }
            MatchOutcome::Draw => {
                debug!("Duel {} was a draw, ratings unchanged", match_id);
            }
        }

        self.store.end_match(match_id, &outcome, ended_at).await?;

        for player_id in [&record.player1_id, &record.player2_id] {
            let delivered = self
                .notifier
                .notify(
                    player_id,
                    ClientEvent::MatchEnd {
                        summary: record.clone(),
                    },
                )
                .await;
            self.metrics_collector
                .record_notification("match_end", delivered);
        }

        let duration = (ended_at - record.started_at).to_std().unwrap_or_default();
        self.metrics_collector
            .record_duel_resolved(outcome.is_draw(), duration);

        Ok(Some(record))
    }

    /// Look up the winner's and loser's records and write back their new
    /// win/loss counts and ratings
    async fn apply_rating_updates(&self, winner_id: &str, loser_id: &str) -> Result<()> {
        let winner = self.store.get_user(winner_id).await?;
        let loser = self.store.get_user(loser_id).await?;

        let (winner, loser) = match (winner, loser) {
            (Some(winner), Some(loser)) => (winner, loser),
            _ => {
                warn!(
                    "Skipping rating update - missing user record for '{}' or '{}'",
                    winner_id, loser_id
                );
                return Ok(());
            }
        };

        let timer = self.metrics_collector.start_timer();
        let adjustment = match self.rating_calculator.calculate(winner.elo, loser.elo) {
            Ok(adjustment) => {
                self.metrics_collector
                    .record_rating_calculation(true, timer.stop());
                adjustment
            }
            Err(e) => {
                self.metrics_collector
                    .record_rating_calculation(false, timer.stop());
                return Err(e);
            }
        };

        info!(
            "Rating adjustment - '{}' {} -> {}, '{}' {} -> {}",
            winner_id,
            winner.elo,
            winner.elo + adjustment.winner_delta,
            loser_id,
            loser.elo,
            loser.elo - adjustment.loser_delta
        );

        self.store
            .update_user_stats(
                winner_id,
                winner.wins + 1,
                winner.losses,
                winner.elo + adjustment.winner_delta,
            )
            .await?;
        self.store
            .update_user_stats(
                loser_id,
                loser.wins,
                loser.losses + 1,
                loser.elo - adjustment.loser_delta,
            )
            .await?;

        Ok(())
    }

    /// Get a duel's current record, resolving it first if its deadline
    /// has passed
    ///
    /// Falls back to the store for duels already evicted from memory.
    pub async fn get_or_resolve(&self, match_id: &MatchId) -> Result<Option<MatchRecord>> {
        let snapshot = {
            let duels = self
                .duels
                .read()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire duels lock".to_string(),
                })?;
            duels.get(match_id).cloned()
        };

        let duel = match snapshot {
            Some(duel) => duel,
            None => return self.store.get_match(match_id).await,
        };

        if !duel.is_expired(current_timestamp()) {
            return Ok(Some(duel.to_record()));
        }

        if let Some(record) = self.resolve(match_id).await? {
            return Ok(Some(record));
        }

        // Another caller resolved it between our snapshot and here
        let finished = {
            let duels = self
                .duels
                .read()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire duels lock".to_string(),
                })?;
            duels.get(match_id).map(|duel| duel.to_record())
        };

        match finished {
            Some(record) => Ok(Some(record)),
            None => self.store.get_match(match_id).await,
        }
    }

    /// Resolve every duel whose deadline has passed
    ///
    /// Works from a point-in-time snapshot so no lock is held across the
    /// scan. A failure on one duel is logged and the sweep moves on.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let now = current_timestamp();

        let expired: Vec<MatchId> = {
            let duels = self
                .duels
                .read()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire duels lock".to_string(),
                })?;

            duels
                .values()
                .filter(|duel| duel.is_expired(now))
                .map(|duel| duel.match_id())
                .collect()
        };

        if expired.is_empty() {
            return Ok(0);
        }

        debug!("Sweeping {} expired duels", expired.len());

        let mut resolved_count: u64 = 0;
        for match_id in expired {
            match self.resolve(&match_id).await {
                Ok(Some(record)) => {
                    resolved_count += 1;
                    debug!(
                        "Timed out duel {} resolved - scores {}:{}",
                        match_id, record.player1_score, record.player2_score
                    );
                }
                Ok(None) => {
                    // Beaten to it by an eager status read
                }
                Err(e) => {
                    error!("Failed to resolve expired duel {}: {}", match_id, e);
                }
            }
        }

        if resolved_count > 0 {
            {
                let mut stats = self
                    .stats
                    .write()
                    .map_err(|_| ArenaError::InternalError {
                        message: "Failed to acquire stats lock".to_string(),
                    })?;
                stats.duels_timed_out += resolved_count;
            }

            info!("Resolved {} timed out duels", resolved_count);
        }

        Ok(resolved_count as usize)
    }

    /// Drop finished duels that have outlived their retention window
    ///
    /// Evicted duels stay readable through the store.
    pub async fn evict_finished(&self) -> Result<usize> {
        let now = current_timestamp();
        let retention = Duration::milliseconds(self.settings.finished_retention_ms as i64);

        let mut evicted_count: u64 = 0;
        let to_evict: Vec<MatchId> = {
            let duels = self
                .duels
                .read()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire duels lock".to_string(),
                })?;

            duels
                .values()
                .filter(|duel| duel.should_evict(now, retention))
                .map(|duel| duel.match_id())
                .collect()
        };

        if !to_evict.is_empty() {
            let mut duels = self
                .duels
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire duels lock".to_string(),
                })?;

            for match_id in to_evict {
                if duels.remove(&match_id).is_some() {
                    evicted_count += 1;
                    debug!("Evicted finished duel {}", match_id);
                }
            }
        }

        if evicted_count > 0 {
            {
                let mut stats = self
                    .stats
                    .write()
                    .map_err(|_| ArenaError::InternalError {
                        message: "Failed to acquire stats lock".to_string(),
                    })?;
                stats.duels_evicted += evicted_count;
            }

            self.metrics_collector.record_duels_evicted(evicted_count);
            info!("Evicted {} finished duels from memory", evicted_count);
        }

        self.refresh_population_stats()?;

        Ok(evicted_count as usize)
    }

    /// Get current registry statistics
    pub async fn get_stats(&self) -> Result<DuelRegistryStats> {
        let stats = self
            .stats
            .read()
            .map_err(|_| ArenaError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;

        Ok(stats.clone())
    }

    /// Recount the in-memory duel population into stats and gauges
    fn refresh_population_stats(&self) -> Result<()> {
        let (active, finished) = {
            let duels = self
                .duels
                .read()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire duels lock".to_string(),
                })?;

            let active = duels.values().filter(|duel| duel.is_active()).count();
            (active, duels.len() - active)
        };

        {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.active_duels = active;
            stats.finished_retained = finished;
        }

        self.metrics_collector.set_active_duels(active);
        Ok(())
    }

    /// Move a duel's deadline (for testing)
    #[cfg(test)]
    pub fn set_duel_deadline(
        &self,
        match_id: &MatchId,
        deadline: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        match self.duels.write() {
            Ok(mut duels) => match duels.get_mut(match_id) {
                Some(duel) => {
                    duel.set_deadline(deadline);
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}
