//! Player directory for registration, profiles, and standings
//!
//! This module fronts the store for everything user-facing that is not
//! a live duel: creating accounts, renaming them, and reading the
//! leaderboard and per-user match history.

use crate::config::{ArenaSettings, RatingSettings};
use crate::error::{ArenaError, Result};
use crate::metrics::MetricsCollector;
use crate::storage::ArenaStore;
use crate::types::{LeaderboardRow, MatchRecord, UserRecord};
use crate::utils::{default_username, generate_user_id};
use std::sync::Arc;
use tracing::{info, warn};

/// Longest accepted display name, in characters
const MAX_USERNAME_LENGTH: usize = 20;

/// The player directory
#[derive(Clone)]
pub struct PlayerDirectory {
    /// Store for user records and finished matches
    store: Arc<dyn ArenaStore>,
    /// Arena limits (leaderboard and history sizes)
    settings: ArenaSettings,
    /// Rating defaults for new accounts
    rating_settings: RatingSettings,
    /// Metrics collector for recording performance data
    metrics_collector: Arc<MetricsCollector>,
}

impl PlayerDirectory {
    /// Create a new player directory
    pub fn new(
        store: Arc<dyn ArenaStore>,
        settings: ArenaSettings,
        rating_settings: RatingSettings,
    ) -> Self {
        // Create a default metrics collector if none provided
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_metrics(store, settings, rating_settings, metrics_collector)
    }

    /// Create a new player directory with metrics collector
    pub fn with_metrics(
        store: Arc<dyn ArenaStore>,
        settings: ArenaSettings,
        rating_settings: RatingSettings,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            settings,
            rating_settings,
            metrics_collector,
        }
    }

    /// Register a new user with a generated id
    ///
    /// Without a username the account gets a placeholder derived from the
    /// tail of its id.
    pub async fn register(&self, username: Option<String>) -> Result<UserRecord> {
        let user_id = generate_user_id();
        let username = match username {
            Some(username) => {
                validate_username(&username)?;
                username
            }
            None => default_username(&user_id),
        };

        let user = UserRecord::new(user_id, username, self.rating_settings.starting_elo);
        self.store.create_user(&user).await?;
        self.metrics_collector.record_user_registered();

        info!(
            "Registered user '{}' ('{}') at rating {}",
            user.user_id, user.username, user.elo
        );
        Ok(user)
    }

    /// Fetch a user's profile
    pub async fn profile(&self, user_id: &str) -> Result<UserRecord> {
        match self.store.get_user(user_id).await? {
            Some(user) => Ok(user),
            None => Err(ArenaError::UserNotFound {
                user_id: user_id.to_string(),
            }
            .into()),
        }
    }

    /// Change a user's display name
    pub async fn set_username(&self, user_id: &str, username: &str) -> Result<()> {
        validate_username(username)?;
        self.store.update_username(user_id, username).await?;

        info!("Updated username for '{}' to '{}'", user_id, username);
        Ok(())
    }

    /// Top players by rating, capped at the configured limit
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>> {
        let users = self.store.leaderboard(self.settings.leaderboard_limit).await?;
        Ok(users.iter().map(LeaderboardRow::from).collect())
    }

    /// A user's recent finished matches, newest first
    ///
    /// An unknown user simply has no history.
    pub async fn history(&self, user_id: &str) -> Result<Vec<MatchRecord>> {
        self.store
            .match_history(user_id, self.settings.history_limit)
            .await
    }
}

fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(ArenaError::InvalidRequest {
            reason: "Username must not be empty".to_string(),
        }
        .into());
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ArenaError::InvalidRequest {
            reason: format!("Username must be at most {} characters", MAX_USERNAME_LENGTH),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryArenaStore;
    use crate::types::{DuelPhase, MatchOutcome};
    use crate::utils::current_timestamp;
    use chrono::Duration;
    use uuid::Uuid;

    fn create_test_directory() -> (PlayerDirectory, Arc<InMemoryArenaStore>) {
        let store = Arc::new(InMemoryArenaStore::new());
        let directory = PlayerDirectory::new(
            store.clone(),
            ArenaSettings::default(),
            RatingSettings::default(),
        );
        (directory, store)
    }

    #[tokio::test]
    async fn test_register_with_defaults() {
        let (directory, _store) = create_test_directory();

        let user = directory.register(None).await.unwrap();

        assert!(user.user_id.starts_with("ARNG-"));
        assert_eq!(user.username, default_username(&user.user_id));
        assert_eq!(user.elo, 1000);
        assert_eq!((user.wins, user.losses), (0, 0));

        let fetched = directory.profile(&user.user_id).await.unwrap();
        assert_eq!(fetched.username, user.username);
    }

    #[tokio::test]
    async fn test_register_with_custom_username() {
        let (directory, _store) = create_test_directory();

        let user = directory.register(Some("dicequeen".to_string())).await.unwrap();
        assert_eq!(user.username, "dicequeen");

        assert!(directory.register(Some(String::new())).await.is_err());
        assert!(directory
            .register(Some("a".repeat(MAX_USERNAME_LENGTH + 1)))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_profile_unknown_user() {
        let (directory, _store) = create_test_directory();
        assert!(directory.profile("ARNG-MISSING1").await.is_err());
    }

    #[tokio::test]
    async fn test_set_username() {
        let (directory, _store) = create_test_directory();
        let user = directory.register(None).await.unwrap();

        directory.set_username(&user.user_id, "roller").await.unwrap();
        assert_eq!(directory.profile(&user.user_id).await.unwrap().username, "roller");

        assert!(directory.set_username(&user.user_id, "").await.is_err());
        assert!(directory.set_username("ARNG-MISSING1", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_leaderboard_rows_carry_winrate() {
        let (directory, store) = create_test_directory();

        let strong = directory.register(Some("strong".to_string())).await.unwrap();
        let weak = directory.register(Some("weak".to_string())).await.unwrap();
        store
            .update_user_stats(&strong.user_id, 2, 1, 1048)
            .await
            .unwrap();
        store.update_user_stats(&weak.user_id, 0, 3, 952).await.unwrap();

        let rows = directory.leaderboard().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].username, "strong");
        assert_eq!(rows[0].elo, 1048);
        assert_eq!(rows[0].winrate, 66.7);
        assert_eq!(rows[1].winrate, 0.0);
    }

    #[tokio::test]
    async fn test_history_is_scoped_and_capped() {
        let (directory, store) = create_test_directory();
        let user = directory.register(None).await.unwrap();

        let now = current_timestamp();
        for i in 0..3 {
            let record = MatchRecord {
                match_id: Uuid::new_v4(),
                player1_id: user.user_id.clone(),
                player2_id: format!("ARNG-RIVAL{:03}", i),
                player1_score: 10,
                player2_score: 5,
                outcome: None,
                started_at: now,
                deadline: now + Duration::milliseconds(120_000),
                ended_at: None,
                phase: DuelPhase::Active,
            };
            store.create_match(&record).await.unwrap();
            store
                .end_match(
                    &record.match_id,
                    &MatchOutcome::Winner(user.user_id.clone()),
                    now + Duration::seconds(i),
                )
                .await
                .unwrap();
        }

        let history = directory.history(&user.user_id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history[0].ended_at >= history[1].ended_at);

        assert!(directory.history("ARNG-MISSING1").await.unwrap().is_empty());
    }
}
