//! Challenge queue implementation for mutual opt-in pairing
//!
//! This module holds pending challenge tickets and completes a pairing
//! the moment two users have named each other. There is no pool matching
//! and no skill gating; a ticket waits until its named opponent
//! reciprocates or the requester cancels.

use crate::duel::DuelRegistry;
use crate::error::{ArenaError, Result};
use crate::metrics::MetricsCollector;
use crate::notify::Notifier;
use crate::storage::ArenaStore;
use crate::types::{ClientEvent, MatchId, UserId};
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// A pending challenge awaiting reciprocation
#[derive(Debug, Clone)]
pub struct QueueTicket {
    /// User who asked for the pairing
    pub requester_id: UserId,
    /// User they want to face
    pub opponent_id: UserId,
    /// When the ticket was created
    pub requested_at: DateTime<Utc>,
}

impl QueueTicket {
    fn new(requester_id: UserId, opponent_id: UserId) -> Self {
        Self {
            requester_id,
            opponent_id,
            requested_at: current_timestamp(),
        }
    }
}

/// Result of a join request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Both users named each other, a duel was created
    Matched { match_id: MatchId, opponent: UserId },
    /// Parked until the named opponent reciprocates
    Waiting,
}

/// Statistics about challenge queue operations
#[derive(Debug, Clone, Default)]
pub struct ChallengeQueueStats {
    /// Total number of join requests handled
    pub joins_total: u64,
    /// Total number of pairings completed
    pub matches_made: u64,
    /// Total number of tickets replaced by a newer join
    pub tickets_replaced: u64,
    /// Total number of cancellations that removed a ticket
    pub cancellations: u64,
    /// Current number of tickets waiting
    pub tickets_waiting: usize,
}

/// The challenge queue
#[derive(Clone)]
pub struct ChallengeQueue {
    /// Pending tickets keyed by requester id
    tickets: Arc<RwLock<HashMap<UserId, QueueTicket>>>,
    /// Duel registry used to create matches on a successful pairing
    registry: Arc<DuelRegistry>,
    /// Store used to validate requesters
    store: Arc<dyn ArenaStore>,
    /// Notifier for match_found events
    notifier: Arc<dyn Notifier>,
    /// Queue statistics
    stats: Arc<RwLock<ChallengeQueueStats>>,
    /// Metrics collector for recording performance data
    metrics_collector: Arc<MetricsCollector>,
}

impl ChallengeQueue {
    /// Create a new challenge queue
    pub fn new(
        registry: Arc<DuelRegistry>,
        store: Arc<dyn ArenaStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        // Create a default metrics collector if none provided
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_metrics(registry, store, notifier, metrics_collector)
    }

    /// Create a new challenge queue with metrics collector
    pub fn with_metrics(
        registry: Arc<DuelRegistry>,
        store: Arc<dyn ArenaStore>,
        notifier: Arc<dyn Notifier>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            tickets: Arc::new(RwLock::new(HashMap::new())),
            registry,
            store,
            notifier,
            stats: Arc::new(RwLock::new(ChallengeQueueStats::default())),
            metrics_collector,
        }
    }

    /// Handle a join request from a user naming a desired opponent
    ///
    /// The requester must exist; the opponent id is taken as given and
    /// need not. Joining again replaces any earlier ticket, so a user
    /// holds at most one at a time.
    pub async fn join(&self, requester_id: UserId, opponent_id: UserId) -> Result<JoinOutcome> {
        info!(
            "Processing join request - requester: '{}', opponent: '{}'",
            requester_id, opponent_id
        );

        if self.store.get_user(&requester_id).await?.is_none() {
            return Err(ArenaError::UserNotFound {
                user_id: requester_id,
            }
            .into());
        }

        {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.joins_total += 1;
        }

        // Mutual check and ticket bookkeeping happen in one critical
        // section so two concurrent joins cannot both park
        let reciprocal_ticket = {
            let mut tickets = self
                .tickets
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire tickets lock".to_string(),
                })?;

            let reciprocal = tickets
                .get(&opponent_id)
                .map(|ticket| ticket.opponent_id == requester_id)
                .unwrap_or(false);

            if reciprocal {
                let ticket = tickets.remove(&opponent_id);
                tickets.remove(&requester_id);
                ticket
            } else {
                let replaced = tickets
                    .insert(
                        requester_id.clone(),
                        QueueTicket::new(requester_id.clone(), opponent_id.clone()),
                    )
                    .is_some();
                if replaced {
                    debug!("Replaced pending ticket for '{}'", requester_id);
                    let mut stats =
                        self.stats
                            .write()
                            .map_err(|_| ArenaError::InternalError {
                                message: "Failed to acquire stats lock".to_string(),
                            })?;
                    stats.tickets_replaced += 1;
                }
                None
            }
        };

        let reciprocal_ticket = match reciprocal_ticket {
            Some(ticket) => ticket,
            None => {
                self.refresh_waiting_stats()?;
                self.metrics_collector.record_queue_join(false);

                info!(
                    "No reciprocal ticket from '{}', parking '{}'",
                    opponent_id, requester_id
                );
                return Ok(JoinOutcome::Waiting);
            }
        };

        let record = self
            .registry
            .create_duel(requester_id.clone(), opponent_id.clone())
            .await?;

        {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.matches_made += 1;
        }
        self.refresh_waiting_stats()?;
        self.metrics_collector.record_queue_join(true);

        let wait = (current_timestamp() - reciprocal_ticket.requested_at)
            .to_std()
            .unwrap_or_default();
        self.metrics_collector.record_pairing_wait(wait);

        info!(
            "Paired '{}' with '{}' in duel {} after {:.2}s wait",
            requester_id,
            opponent_id,
            record.match_id,
            wait.as_secs_f64()
        );

        for (recipient, other) in [
            (&requester_id, &opponent_id),
            (&opponent_id, &requester_id),
        ] {
            let delivered = self
                .notifier
                .notify(
                    recipient,
                    ClientEvent::MatchFound {
                        match_id: record.match_id,
                        opponent: other.clone(),
                    },
                )
                .await;
            self.metrics_collector
                .record_notification("match_found", delivered);
        }

        Ok(JoinOutcome::Matched {
            match_id: record.match_id,
            opponent: opponent_id,
        })
    }

    /// Remove a user's pending ticket, returning whether one existed
    ///
    /// Cancelling without a ticket is not an error.
    pub fn cancel(&self, requester_id: &str) -> Result<bool> {
        let removed = {
            let mut tickets = self
                .tickets
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire tickets lock".to_string(),
                })?;
            tickets.remove(requester_id).is_some()
        };

        if removed {
            {
                let mut stats = self
                    .stats
                    .write()
                    .map_err(|_| ArenaError::InternalError {
                        message: "Failed to acquire stats lock".to_string(),
                    })?;
                stats.cancellations += 1;
            }
            self.refresh_waiting_stats()?;
            self.metrics_collector.record_queue_cancel();

            debug!("Cancelled pending ticket for '{}'", requester_id);
        }

        Ok(removed)
    }

    /// Get a user's pending ticket, if any
    pub fn pending_ticket(&self, requester_id: &str) -> Result<Option<QueueTicket>> {
        let tickets = self
            .tickets
            .read()
            .map_err(|_| ArenaError::InternalError {
                message: "Failed to acquire tickets lock".to_string(),
            })?;

        Ok(tickets.get(requester_id).cloned())
    }

    /// Get current queue statistics
    pub async fn get_stats(&self) -> Result<ChallengeQueueStats> {
        let stats = self
            .stats
            .read()
            .map_err(|_| ArenaError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;

        Ok(stats.clone())
    }

    /// Recount waiting tickets into stats and gauges
    fn refresh_waiting_stats(&self) -> Result<()> {
        let waiting = {
            let tickets = self
                .tickets
                .read()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire tickets lock".to_string(),
                })?;
            tickets.len()
        };

        {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| ArenaError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.tickets_waiting = waiting;
        }

        self.metrics_collector.set_waiting_tickets(waiting);
        Ok(())
    }
}
