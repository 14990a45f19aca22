//! Arena Testing Tool and Test Suite
//!
//! This module provides utilities to drive a full in-process arena including:
//! - Registering players with live event connections
//! - Issuing challenges, rolls, and reads against the running service
//! - Automated test scenarios for various duel outcomes
//!
//! Run with: `cargo test arena_tester`
//! Or use the CLI tool: `cargo run --bin arena-tester`

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use roll_arena::config::AppConfig;
use roll_arena::queue::JoinOutcome;
use roll_arena::service::AppState;
use roll_arena::types::{ClientEvent, MatchId, MatchRecord, UserRecord};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Arena tester that drives a complete in-process service and records
/// every client event the service pushes out
pub struct ArenaTester {
    app_state: Arc<AppState>,
    events: Arc<Mutex<Vec<(String, ClientEvent)>>>,
    tester_stats: Arc<Mutex<TesterStats>>,
    pump_tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Statistics about tester-driven operations
#[derive(Debug, Default, Clone)]
#[allow(dead_code)]
pub struct TesterStats {
    pub players_registered: u32,
    pub duels_started: u32,
    pub rolls_submitted: u32,
    pub duels_finished: u32,
    pub draws: u32,
}

/// Configuration for an arena test scenario
#[derive(Debug, Clone)]
pub struct ArenaTestConfig {
    pub scenario_name: String,
    pub duels: Vec<DuelScript>,
    pub timeout_seconds: u64,
}

/// One scripted duel: who plays, what they roll, and who should win
///
/// Rolls are (side, score) pairs where side 1 is player1 and side 2 is
/// player2. An expected winner of `None` means the duel should draw.
#[derive(Debug, Clone)]
pub struct DuelScript {
    pub player1: String,
    pub player2: String,
    pub rolls: Vec<(u8, u64)>,
    pub expected_winner: Option<String>,
}

impl ArenaTestConfig {
    /// Distinct player names referenced by the scenario, in script order
    pub fn player_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for script in &self.duels {
            for name in [&script.player1, &script.player2] {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}

impl ArenaTester {
    /// Create a tester over a fresh in-process arena with fast duel timing
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(Self::quick_test_config()).await
    }

    /// Create a tester with a custom configuration
    pub async fn with_config(config: AppConfig) -> anyhow::Result<Self> {
        let app_state = Arc::new(AppState::new(config)?);
        app_state.attach_health_state().await;
        app_state.start().await?;

        Ok(Self {
            app_state,
            events: Arc::new(Mutex::new(Vec::new())),
            tester_stats: Arc::new(Mutex::new(TesterStats::default())),
            pump_tasks: Mutex::new(Vec::new()),
        })
    }

    /// Configuration with short duels so scenarios resolve quickly
    ///
    /// The health server stays off to keep concurrent test runs from
    /// fighting over the port.
    pub fn quick_test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.service.enable_metrics = false;
        config.arena.match_duration_ms = 2_000;
        config.arena.sweep_interval_ms = 100;
        config
    }

    /// Access the underlying application state
    #[cfg(test)]
    pub fn app_state(&self) -> Arc<AppState> {
        self.app_state.clone()
    }

    /// Register a player and open a live event connection for them
    pub async fn register_player(&self, username: &str) -> anyhow::Result<UserRecord> {
        let user = self
            .app_state
            .directory()
            .register(Some(username.to_string()))
            .await
            .with_context(|| format!("Failed to register player '{}'", username))?;

        // Pump the player's event stream into the shared log
        let mut receiver = self.app_state.connect_client(&user.user_id);
        let events = self.events.clone();
        let user_id = user.user_id.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Ok(mut events) = events.lock() {
                    events.push((user_id.clone(), event));
                }
            }
        });

        if let Ok(mut pumps) = self.pump_tasks.lock() {
            pumps.push(pump);
        }
        if let Ok(mut stats) = self.tester_stats.lock() {
            stats.players_registered += 1;
        }

        Ok(user)
    }

    /// Issue a challenge from one user against another
    pub async fn challenge(
        &self,
        requester_id: &str,
        opponent_id: &str,
    ) -> anyhow::Result<JoinOutcome> {
        let outcome = self
            .app_state
            .queue()
            .join(requester_id.to_string(), opponent_id.to_string())
            .await?;

        if matches!(outcome, JoinOutcome::Matched { .. }) {
            if let Ok(mut stats) = self.tester_stats.lock() {
                stats.duels_started += 1;
            }
        }

        Ok(outcome)
    }

    /// Submit a roll score into a running duel
    pub async fn submit_roll(
        &self,
        match_id: &MatchId,
        user_id: &str,
        score: u64,
    ) -> anyhow::Result<()> {
        self.app_state
            .registry()
            .submit_roll(match_id, user_id, score)
            .await?;

        if let Ok(mut stats) = self.tester_stats.lock() {
            stats.rolls_submitted += 1;
        }

        Ok(())
    }

    /// Read a match, resolving it first if its deadline has passed
    #[cfg(test)]
    pub async fn fetch_match(&self, match_id: &MatchId) -> anyhow::Result<Option<MatchRecord>> {
        Ok(self.app_state.registry().get_or_resolve(match_id).await?)
    }

    /// Look up a player's current profile
    pub async fn profile(&self, user_id: &str) -> anyhow::Result<UserRecord> {
        Ok(self.app_state.directory().profile(user_id).await?)
    }

    /// Read the current leaderboard
    pub async fn leaderboard(&self) -> anyhow::Result<Vec<roll_arena::types::LeaderboardRow>> {
        Ok(self.app_state.directory().leaderboard().await?)
    }

    /// Events observed for one player, in arrival order
    #[cfg(test)]
    pub fn events_for(&self, user_id: &str) -> Vec<ClientEvent> {
        self.events
            .lock()
            .map(|events| {
                events
                    .iter()
                    .filter(|(id, _)| id == user_id)
                    .map(|(_, event)| event.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Wait until a duel's end notification arrives, returning its record
    pub async fn wait_for_duel_end(
        &self,
        match_id: &MatchId,
        wait: Duration,
    ) -> Option<MatchRecord> {
        let result = timeout(wait, async {
            loop {
                if let Some(record) = self.find_ended(match_id) {
                    return record;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        result.ok()
    }

    /// Run a scripted scenario end to end and verify every duel's outcome
    pub async fn run_test_scenario(&self, config: ArenaTestConfig) -> anyhow::Result<bool> {
        println!("🧪 Running test scenario: {}", config.scenario_name);

        let start_time = Instant::now();
        self.clear_events();

        // Register every player the scenario names
        let mut ids: HashMap<String, String> = HashMap::new();
        for name in config.player_names() {
            let user = self.register_player(&name).await?;
            ids.insert(name, user.user_id);
        }

        // Fire the mutual challenges
        let mut duel_ids = Vec::new();
        for script in &config.duels {
            let p1 = ids[&script.player1].clone();
            let p2 = ids[&script.player2].clone();

            let first = self.challenge(&p1, &p2).await?;
            anyhow::ensure!(
                matches!(first, JoinOutcome::Waiting),
                "first challenge in '{}' should park the requester",
                config.scenario_name
            );

            match self.challenge(&p2, &p1).await? {
                JoinOutcome::Matched { match_id, .. } => duel_ids.push(match_id),
                JoinOutcome::Waiting => {
                    anyhow::bail!("reciprocal challenge did not pair in '{}'", config.scenario_name)
                }
            }
        }

        // Submit the scripted rolls
        for (script, match_id) in config.duels.iter().zip(&duel_ids) {
            for (side, score) in &script.rolls {
                let roller = if *side == 1 {
                    &script.player1
                } else {
                    &script.player2
                };
                self.submit_roll(match_id, &ids[roller], *score).await?;
            }
        }

        // Wait for every duel to run out and resolve
        let timeout_duration = Duration::from_secs(config.timeout_seconds);
        let result = timeout(timeout_duration, async {
            loop {
                let ended = self.ended_duels(&duel_ids);
                if ended.len() >= duel_ids.len() {
                    return ended;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        let duration = start_time.elapsed();
        let ended = match result {
            Ok(ended) => ended,
            Err(_) => {
                println!(
                    "❌ Scenario '{}' timed out after {:.2}s",
                    config.scenario_name,
                    duration.as_secs_f64()
                );
                return Ok(false);
            }
        };

        // Verify each duel ended the way the script expects
        let mut all_good = true;
        for (script, match_id) in config.duels.iter().zip(&duel_ids) {
            let record = &ended[match_id];
            let expected = script.expected_winner.as_ref().map(|name| ids[name].clone());
            let actual = record
                .outcome
                .as_ref()
                .and_then(|outcome| outcome.winner_id().cloned());

            if actual != expected {
                println!(
                    "❌ Duel {}: expected winner {:?}, got {:?}",
                    match_id, expected, actual
                );
                all_good = false;
            }

            if let Ok(mut stats) = self.tester_stats.lock() {
                stats.duels_finished += 1;
                if record.outcome.as_ref().is_some_and(|o| o.is_draw()) {
                    stats.draws += 1;
                }
            }
        }

        if all_good {
            println!(
                "✅ Scenario '{}' completed successfully in {:.2}s",
                config.scenario_name,
                duration.as_secs_f64()
            );
        } else {
            println!(
                "❌ Scenario '{}' finished with unexpected outcomes after {:.2}s",
                config.scenario_name,
                duration.as_secs_f64()
            );
        }

        Ok(all_good)
    }

    /// Get tester statistics
    pub fn get_stats(&self) -> TesterStats {
        self.tester_stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    /// Clear collected events and statistics between scenarios
    pub fn reset(&self) {
        self.clear_events();
        if let Ok(mut stats) = self.tester_stats.lock() {
            *stats = TesterStats::default();
        }
    }

    /// Shut the arena down and stop event pumps
    pub async fn shutdown(&self) {
        if let Ok(mut pumps) = self.pump_tasks.lock() {
            for pump in pumps.drain(..) {
                pump.abort();
            }
        }

        if let Err(e) = self.app_state.shutdown().await {
            eprintln!("⚠️  Arena shutdown reported an error: {}", e);
        }
    }

    fn clear_events(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn find_ended(&self, match_id: &MatchId) -> Option<MatchRecord> {
        self.events.lock().ok().and_then(|events| {
            events.iter().find_map(|(_, event)| match event {
                ClientEvent::MatchEnd { summary } if summary.match_id == *match_id => {
                    Some(summary.clone())
                }
                _ => None,
            })
        })
    }

    fn ended_duels(&self, duel_ids: &[MatchId]) -> HashMap<MatchId, MatchRecord> {
        let mut ended = HashMap::new();
        if let Ok(events) = self.events.lock() {
            for (_, event) in events.iter() {
                if let ClientEvent::MatchEnd { summary } = event {
                    if duel_ids.contains(&summary.match_id) {
                        ended.insert(summary.match_id, summary.clone());
                    }
                }
            }
        }
        ended
    }
}

/// Predefined test scenarios
pub struct TestScenarios;

impl TestScenarios {
    /// Two players, one clear winner
    pub fn basic_duel() -> ArenaTestConfig {
        ArenaTestConfig {
            scenario_name: "basic-duel".to_string(),
            duels: vec![DuelScript {
                player1: "alice".to_string(),
                player2: "bob".to_string(),
                rolls: vec![(1, 42), (2, 17)],
                expected_winner: Some("alice".to_string()),
            }],
            timeout_seconds: 20,
        }
    }

    /// Equal best scores end in a draw
    pub fn dead_heat() -> ArenaTestConfig {
        ArenaTestConfig {
            scenario_name: "dead-heat".to_string(),
            duels: vec![DuelScript {
                player1: "carol".to_string(),
                player2: "dave".to_string(),
                rolls: vec![(1, 37), (2, 37)],
                expected_winner: None,
            }],
            timeout_seconds: 20,
        }
    }

    /// Only one side ever rolls; the silent opponent loses at the deadline
    pub fn silent_opponent() -> ArenaTestConfig {
        ArenaTestConfig {
            scenario_name: "silent-opponent".to_string(),
            duels: vec![DuelScript {
                player1: "erin".to_string(),
                player2: "frank".to_string(),
                rolls: vec![(1, 5)],
                expected_winner: Some("erin".to_string()),
            }],
            timeout_seconds: 20,
        }
    }

    /// Three players dueling each other pairwise, with later rolls
    /// exercising the keep-the-best rule
    pub fn round_robin() -> ArenaTestConfig {
        ArenaTestConfig {
            scenario_name: "round-robin".to_string(),
            duels: vec![
                DuelScript {
                    player1: "gina".to_string(),
                    player2: "hank".to_string(),
                    rolls: vec![(1, 10), (2, 30), (1, 55), (2, 41)],
                    expected_winner: Some("gina".to_string()),
                },
                DuelScript {
                    player1: "gina".to_string(),
                    player2: "ivan".to_string(),
                    rolls: vec![(1, 20), (2, 80)],
                    expected_winner: Some("ivan".to_string()),
                },
                DuelScript {
                    player1: "hank".to_string(),
                    player2: "ivan".to_string(),
                    rolls: vec![(1, 60), (2, 60), (2, 12)],
                    expected_winner: None,
                },
            ],
            timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_connect() {
        let tester = ArenaTester::new().await.expect("Failed to create tester");

        let alice = tester.register_player("alice").await.unwrap();
        assert!(alice.user_id.starts_with("ARNG-"));
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.elo, 1000);
        assert!(tester.app_state().notifier().is_connected(&alice.user_id));

        tester.shutdown().await;
    }

    #[tokio::test]
    async fn test_basic_duel_scenario() {
        let tester = ArenaTester::new().await.expect("Failed to create tester");

        let passed = tester
            .run_test_scenario(TestScenarios::basic_duel())
            .await
            .unwrap();
        assert!(passed);

        tester.shutdown().await;
    }

    #[tokio::test]
    async fn test_dead_heat_scenario() {
        let tester = ArenaTester::new().await.expect("Failed to create tester");

        let passed = tester
            .run_test_scenario(TestScenarios::dead_heat())
            .await
            .unwrap();
        assert!(passed);

        let stats = tester.get_stats();
        assert_eq!(stats.duels_finished, 1);
        assert_eq!(stats.draws, 1);

        tester.shutdown().await;
    }

    #[tokio::test]
    async fn test_silent_opponent_scenario() {
        let tester = ArenaTester::new().await.expect("Failed to create tester");

        let passed = tester
            .run_test_scenario(TestScenarios::silent_opponent())
            .await
            .unwrap();
        assert!(passed);

        tester.shutdown().await;
    }

    #[tokio::test]
    async fn test_round_robin_scenario() {
        let tester = ArenaTester::new().await.expect("Failed to create tester");

        let passed = tester
            .run_test_scenario(TestScenarios::round_robin())
            .await
            .unwrap();
        assert!(passed);

        let stats = tester.get_stats();
        assert_eq!(stats.duels_started, 3);
        assert_eq!(stats.duels_finished, 3);
        assert_eq!(stats.draws, 1);

        tester.shutdown().await;
    }

    #[tokio::test]
    async fn test_eager_resolution_on_read() {
        // Push the sweep far out so only the read itself can resolve the duel
        let mut config = ArenaTester::quick_test_config();
        config.arena.match_duration_ms = 500;
        config.arena.sweep_interval_ms = 60_000;
        let tester = ArenaTester::with_config(config)
            .await
            .expect("Failed to create tester");

        let alice = tester.register_player("alice").await.unwrap();
        let bob = tester.register_player("bob").await.unwrap();

        tester.challenge(&alice.user_id, &bob.user_id).await.unwrap();
        let match_id = match tester.challenge(&bob.user_id, &alice.user_id).await.unwrap() {
            JoinOutcome::Matched { match_id, .. } => match_id,
            JoinOutcome::Waiting => panic!("reciprocal challenge should pair"),
        };

        tester
            .submit_roll(&match_id, &alice.user_id, 90)
            .await
            .unwrap();

        // Reading before the deadline sees the live duel
        let record = tester.fetch_match(&match_id).await.unwrap().unwrap();
        assert!(!record.is_finished());

        // Past the deadline a read resolves the duel on the spot
        tokio::time::sleep(Duration::from_millis(700)).await;
        let record = tester.fetch_match(&match_id).await.unwrap().unwrap();
        assert!(record.is_finished());
        assert_eq!(record.player1_score.max(record.player2_score), 90);

        tester.shutdown().await;
    }

    #[tokio::test]
    async fn test_events_received_by_both_players() {
        let tester = ArenaTester::new().await.expect("Failed to create tester");

        let passed = tester
            .run_test_scenario(TestScenarios::basic_duel())
            .await
            .unwrap();
        assert!(passed);

        let leaderboard = tester.leaderboard().await.unwrap();
        let alice_row = leaderboard
            .iter()
            .find(|row| row.username == "alice")
            .expect("alice missing from leaderboard");
        let bob_row = leaderboard
            .iter()
            .find(|row| row.username == "bob")
            .expect("bob missing from leaderboard");

        // Winner gains what the loser gives up at equal ratings
        assert_eq!(alice_row.elo, 1016);
        assert_eq!(bob_row.elo, 984);
        assert_eq!(alice_row.wins, 1);
        assert_eq!(bob_row.losses, 1);

        let alice_events = tester.events_for(&alice_row.user_id);
        assert!(alice_events
            .iter()
            .any(|event| event.event_type() == "match_found"));
        assert!(alice_events
            .iter()
            .any(|event| event.event_type() == "opponent_roll"));
        assert!(alice_events
            .iter()
            .any(|event| event.event_type() == "match_end"));

        tester.shutdown().await;
    }
}
