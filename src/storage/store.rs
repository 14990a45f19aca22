//! Arena persistence interface and implementations
//!
//! This module defines the interface for persisting users and match records,
//! with both in-memory and database-ready implementations.

use crate::error::ArenaError;
use crate::types::{MatchId, MatchOutcome, MatchRecord, UserRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

/// Trait for arena persistence operations
///
/// Every call is treated as independently transactional; the engine never
/// batches or rolls back across calls.
#[async_trait]
pub trait ArenaStore: Send + Sync {
    /// Persist a new user record
    async fn create_user(&self, user: &UserRecord) -> crate::error::Result<()>;

    /// Fetch a user by id
    async fn get_user(&self, user_id: &str) -> crate::error::Result<Option<UserRecord>>;

    /// Update a user's display name
    async fn update_username(&self, user_id: &str, username: &str) -> crate::error::Result<()>;

    /// Overwrite a user's wins/losses/elo
    async fn update_user_stats(
        &self,
        user_id: &str,
        wins: u32,
        losses: u32,
        elo: i32,
    ) -> crate::error::Result<()>;

    /// Persist a new match record
    async fn create_match(&self, record: &MatchRecord) -> crate::error::Result<()>;

    /// Fetch a match by id
    async fn get_match(&self, match_id: &MatchId) -> crate::error::Result<Option<MatchRecord>>;

    /// Overwrite a match's score pair
    async fn update_match_score(
        &self,
        match_id: &MatchId,
        player1_score: u64,
        player2_score: u64,
    ) -> crate::error::Result<()>;

    /// Mark a match finished with its outcome and end time
    async fn end_match(
        &self,
        match_id: &MatchId,
        outcome: &MatchOutcome,
        ended_at: DateTime<Utc>,
    ) -> crate::error::Result<()>;

    /// Top users ordered by elo descending (user id ascending on ties)
    async fn leaderboard(&self, limit: usize) -> crate::error::Result<Vec<UserRecord>>;

    /// A user's finished matches, newest first
    async fn match_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> crate::error::Result<Vec<MatchRecord>>;

    /// Total number of stored users
    async fn user_count(&self) -> crate::error::Result<usize>;

    /// Total number of stored matches
    async fn match_count(&self) -> crate::error::Result<usize>;
}

/// In-memory arena store implementation
#[derive(Debug, Default)]
pub struct InMemoryArenaStore {
    users: RwLock<HashMap<String, UserRecord>>,
    matches: RwLock<HashMap<MatchId, MatchRecord>>,
}

impl InMemoryArenaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users_read(&self) -> crate::error::Result<std::sync::RwLockReadGuard<'_, HashMap<String, UserRecord>>> {
        self.users.read().map_err(|_| {
            ArenaError::InternalError {
                message: "Failed to acquire users read lock".to_string(),
            }
            .into()
        })
    }

    fn users_write(&self) -> crate::error::Result<std::sync::RwLockWriteGuard<'_, HashMap<String, UserRecord>>> {
        self.users.write().map_err(|_| {
            ArenaError::InternalError {
                message: "Failed to acquire users write lock".to_string(),
            }
            .into()
        })
    }

    fn matches_read(&self) -> crate::error::Result<std::sync::RwLockReadGuard<'_, HashMap<MatchId, MatchRecord>>> {
        self.matches.read().map_err(|_| {
            ArenaError::InternalError {
                message: "Failed to acquire matches read lock".to_string(),
            }
            .into()
        })
    }

    fn matches_write(&self) -> crate::error::Result<std::sync::RwLockWriteGuard<'_, HashMap<MatchId, MatchRecord>>> {
        self.matches.write().map_err(|_| {
            ArenaError::InternalError {
                message: "Failed to acquire matches write lock".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ArenaStore for InMemoryArenaStore {
    async fn create_user(&self, user: &UserRecord) -> crate::error::Result<()> {
        let mut users = self.users_write()?;
        if users.contains_key(&user.user_id) {
            return Err(ArenaError::UserAlreadyExists {
                user_id: user.user_id.clone(),
            }
            .into());
        }
        users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> crate::error::Result<Option<UserRecord>> {
        let users = self.users_read()?;
        Ok(users.get(user_id).cloned())
    }

    async fn update_username(&self, user_id: &str, username: &str) -> crate::error::Result<()> {
        let mut users = self.users_write()?;
        match users.get_mut(user_id) {
            Some(user) => {
                user.username = username.to_string();
                Ok(())
            }
            None => Err(ArenaError::UserNotFound {
                user_id: user_id.to_string(),
            }
            .into()),
        }
    }

    async fn update_user_stats(
        &self,
        user_id: &str,
        wins: u32,
        losses: u32,
        elo: i32,
    ) -> crate::error::Result<()> {
        let mut users = self.users_write()?;
        match users.get_mut(user_id) {
            Some(user) => {
                user.wins = wins;
                user.losses = losses;
                user.elo = elo;
                Ok(())
            }
            None => Err(ArenaError::UserNotFound {
                user_id: user_id.to_string(),
            }
            .into()),
        }
    }

    async fn create_match(&self, record: &MatchRecord) -> crate::error::Result<()> {
        let mut matches = self.matches_write()?;
        if matches.contains_key(&record.match_id) {
            return Err(ArenaError::MatchAlreadyExists {
                match_id: record.match_id.to_string(),
            }
            .into());
        }
        matches.insert(record.match_id, record.clone());
        Ok(())
    }

    async fn get_match(&self, match_id: &MatchId) -> crate::error::Result<Option<MatchRecord>> {
        let matches = self.matches_read()?;
        Ok(matches.get(match_id).cloned())
    }

    async fn update_match_score(
        &self,
        match_id: &MatchId,
        player1_score: u64,
        player2_score: u64,
    ) -> crate::error::Result<()> {
        let mut matches = self.matches_write()?;
        match matches.get_mut(match_id) {
            Some(record) => {
                record.player1_score = player1_score;
                record.player2_score = player2_score;
                Ok(())
            }
            None => Err(ArenaError::MatchNotFound {
                match_id: match_id.to_string(),
            }
            .into()),
        }
    }

    async fn end_match(
        &self,
        match_id: &MatchId,
        outcome: &MatchOutcome,
        ended_at: DateTime<Utc>,
    ) -> crate::error::Result<()> {
        let mut matches = self.matches_write()?;
        match matches.get_mut(match_id) {
            Some(record) => {
                record.outcome = Some(outcome.clone());
                record.ended_at = Some(ended_at);
                record.phase = crate::types::DuelPhase::Finished;
                Ok(())
            }
            None => Err(ArenaError::MatchNotFound {
                match_id: match_id.to_string(),
            }
            .into()),
        }
    }

    async fn leaderboard(&self, limit: usize) -> crate::error::Result<Vec<UserRecord>> {
        let users = self.users_read()?;

        let mut rows: Vec<UserRecord> = users.values().cloned().collect();
        rows.sort_by(|a, b| b.elo.cmp(&a.elo).then_with(|| a.user_id.cmp(&b.user_id)));
        rows.truncate(limit);

        Ok(rows)
    }

    async fn match_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> crate::error::Result<Vec<MatchRecord>> {
        let matches = self.matches_read()?;

        let mut history: Vec<MatchRecord> = matches
            .values()
            .filter(|record| record.is_finished() && record.involves(user_id))
            .cloned()
            .collect();
        history.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        history.truncate(limit);

        Ok(history)
    }

    async fn user_count(&self) -> crate::error::Result<usize> {
        Ok(self.users_read()?.len())
    }

    async fn match_count(&self) -> crate::error::Result<usize> {
        Ok(self.matches_read()?.len())
    }
}

/// One recorded store operation (for testing)
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    CreateUser(String),
    UpdateUsername(String),
    UpdateUserStats {
        user_id: String,
        wins: u32,
        losses: u32,
        elo: i32,
    },
    CreateMatch(MatchId),
    UpdateMatchScore {
        match_id: MatchId,
        player1_score: u64,
        player2_score: u64,
    },
    EndMatch(MatchId),
}

/// Mock arena store for testing
///
/// Delegates to an in-memory store, records every mutating call, and can be
/// switched into a failing mode where every operation surfaces a
/// persistence failure.
#[derive(Debug, Default)]
pub struct MockArenaStore {
    inner: InMemoryArenaStore,
    calls: Mutex<Vec<StoreCall>>,
    should_fail: AtomicBool,
}

impl MockArenaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a persistence error
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Get all mutating calls made (for testing)
    pub fn get_calls(&self) -> Vec<StoreCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, call: StoreCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check_failure(&self) -> crate::error::Result<()> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(ArenaError::PersistenceFailure {
                message: "Simulated store failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl ArenaStore for MockArenaStore {
    async fn create_user(&self, user: &UserRecord) -> crate::error::Result<()> {
        self.record(StoreCall::CreateUser(user.user_id.clone()));
        self.check_failure()?;
        self.inner.create_user(user).await
    }

    async fn get_user(&self, user_id: &str) -> crate::error::Result<Option<UserRecord>> {
        self.check_failure()?;
        self.inner.get_user(user_id).await
    }

    async fn update_username(&self, user_id: &str, username: &str) -> crate::error::Result<()> {
        self.record(StoreCall::UpdateUsername(user_id.to_string()));
        self.check_failure()?;
        self.inner.update_username(user_id, username).await
    }

    async fn update_user_stats(
        &self,
        user_id: &str,
        wins: u32,
        losses: u32,
        elo: i32,
    ) -> crate::error::Result<()> {
        self.record(StoreCall::UpdateUserStats {
            user_id: user_id.to_string(),
            wins,
            losses,
            elo,
        });
        self.check_failure()?;
        self.inner.update_user_stats(user_id, wins, losses, elo).await
    }

    async fn create_match(&self, record: &MatchRecord) -> crate::error::Result<()> {
        self.record(StoreCall::CreateMatch(record.match_id));
        self.check_failure()?;
        self.inner.create_match(record).await
    }

    async fn get_match(&self, match_id: &MatchId) -> crate::error::Result<Option<MatchRecord>> {
        self.check_failure()?;
        self.inner.get_match(match_id).await
    }

    async fn update_match_score(
        &self,
        match_id: &MatchId,
        player1_score: u64,
        player2_score: u64,
    ) -> crate::error::Result<()> {
        self.record(StoreCall::UpdateMatchScore {
            match_id: *match_id,
            player1_score,
            player2_score,
        });
        self.check_failure()?;
        self.inner
            .update_match_score(match_id, player1_score, player2_score)
            .await
    }

    async fn end_match(
        &self,
        match_id: &MatchId,
        outcome: &MatchOutcome,
        ended_at: DateTime<Utc>,
    ) -> crate::error::Result<()> {
        self.record(StoreCall::EndMatch(*match_id));
        self.check_failure()?;
        self.inner.end_match(match_id, outcome, ended_at).await
    }

    async fn leaderboard(&self, limit: usize) -> crate::error::Result<Vec<UserRecord>> {
        self.check_failure()?;
        self.inner.leaderboard(limit).await
    }

    async fn match_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> crate::error::Result<Vec<MatchRecord>> {
        self.check_failure()?;
        self.inner.match_history(user_id, limit).await
    }

    async fn user_count(&self) -> crate::error::Result<usize> {
        self.check_failure()?;
        self.inner.user_count().await
    }

    async fn match_count(&self) -> crate::error::Result<usize> {
        self.check_failure()?;
        self.inner.match_count().await
    }
}
