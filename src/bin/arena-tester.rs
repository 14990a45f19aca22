//! Arena Tester CLI Tool
//!
//! Interactive command-line tool for driving a full in-process arena.
//!
//! Usage:
//!   cargo run --bin arena-tester -- --help
//!   cargo run --bin arena-tester duel --player1 alice --player2 bob --score1 42 --score2 17
//!   cargo run --bin arena-tester run-scenario --scenario basic-duel
//!   cargo run --bin arena-tester run-all-scenarios
//!   cargo run --bin arena-tester leaderboard --players 4

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use roll_arena::queue::JoinOutcome;
use roll_arena::types::MatchOutcome;

#[path = "../../tests/arena_tester.rs"]
mod arena_tester;

use arena_tester::{ArenaTester, TestScenarios};

#[derive(Parser)]
#[command(name = "arena-tester")]
#[command(about = "Interactive duel testing tool running a complete in-process arena")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single duel between two players and report the outcome
    Duel {
        /// First player's username
        #[arg(long, default_value = "alice")]
        player1: String,
        /// Second player's username
        #[arg(long, default_value = "bob")]
        player2: String,
        /// First player's roll
        #[arg(long, default_value = "42")]
        score1: u64,
        /// Second player's roll
        #[arg(long, default_value = "17")]
        score2: u64,
    },
    /// Run a predefined test scenario
    RunScenario {
        /// Scenario name (basic-duel, dead-heat, silent-opponent, round-robin)
        #[arg(short, long)]
        scenario: String,
    },
    /// Run all test scenarios
    RunAllScenarios,
    /// Simulate a round-robin tournament and print the standings
    Leaderboard {
        /// Number of players to simulate
        #[arg(short, long, default_value = "4")]
        players: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    println!("🏟️  Starting in-process arena...");
    let tester = match ArenaTester::new().await {
        Ok(t) => {
            println!("✅ Arena started successfully!");
            t
        }
        Err(e) => {
            eprintln!("❌ Failed to start arena: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Duel {
            player1,
            player2,
            score1,
            score2,
        } => {
            let p1 = tester.register_player(&player1).await?;
            let p2 = tester.register_player(&player2).await?;
            println!("🎲 {} ({}) vs {} ({})", player1, p1.user_id, player2, p2.user_id);

            tester.challenge(&p1.user_id, &p2.user_id).await?;
            let match_id = match tester.challenge(&p2.user_id, &p1.user_id).await? {
                JoinOutcome::Matched { match_id, .. } => match_id,
                JoinOutcome::Waiting => {
                    eprintln!("❌ Reciprocal challenge did not pair");
                    std::process::exit(1);
                }
            };
            println!("✅ Paired in duel {}", match_id);

            tester.submit_roll(&match_id, &p1.user_id, score1).await?;
            tester.submit_roll(&match_id, &p2.user_id, score2).await?;
            println!("🎲 Rolls submitted: {} vs {}", score1, score2);
            println!("⏳ Waiting for the duel deadline...");

            match tester
                .wait_for_duel_end(&match_id, Duration::from_secs(30))
                .await
            {
                Some(record) => {
                    match &record.outcome {
                        Some(MatchOutcome::Winner(winner_id)) => {
                            let winner = if *winner_id == p1.user_id {
                                &player1
                            } else {
                                &player2
                            };
                            println!("🏆 Winner: {}", winner);
                        }
                        Some(MatchOutcome::Draw) => println!("🤝 Draw - ratings unchanged"),
                        None => println!("❓ Duel ended without an outcome"),
                    }

                    let p1_after = tester.profile(&p1.user_id).await?;
                    let p2_after = tester.profile(&p2.user_id).await?;
                    println!("📊 {}: {} → {} Elo", player1, p1.elo, p1_after.elo);
                    println!("📊 {}: {} → {} Elo", player2, p2.elo, p2_after.elo);
                }
                None => {
                    eprintln!("❌ Duel did not resolve in time");
                    std::process::exit(1);
                }
            }
        }

        Commands::RunScenario { scenario } => {
            let config = match scenario.to_lowercase().as_str() {
                "basic-duel" => TestScenarios::basic_duel(),
                "dead-heat" => TestScenarios::dead_heat(),
                "silent-opponent" => TestScenarios::silent_opponent(),
                "round-robin" => TestScenarios::round_robin(),
                _ => {
                    eprintln!(
                        "❌ Unknown scenario '{}'. Available: basic-duel, dead-heat, silent-opponent, round-robin",
                        scenario
                    );
                    std::process::exit(1);
                }
            };

            println!("🧪 Running scenario: {}", config.scenario_name);
            match tester.run_test_scenario(config).await {
                Ok(success) => {
                    if success {
                        println!("✅ Scenario completed successfully!");
                    } else {
                        println!("❌ Scenario failed or timed out.");
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("❌ Error running scenario: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::RunAllScenarios => {
            let scenarios = vec![
                ("basic-duel", TestScenarios::basic_duel()),
                ("dead-heat", TestScenarios::dead_heat()),
                ("silent-opponent", TestScenarios::silent_opponent()),
                ("round-robin", TestScenarios::round_robin()),
            ];

            let mut passed = 0;
            let mut failed = 0;

            println!("🧪 Running all test scenarios...\n");

            for (name, config) in scenarios {
                print!("Running '{}' scenario... ", name);
                match tester.run_test_scenario(config).await {
                    Ok(success) => {
                        if success {
                            println!("✅ PASSED");
                            passed += 1;
                        } else {
                            println!("❌ FAILED (unexpected outcome or timeout)");
                            failed += 1;
                        }
                    }
                    Err(e) => {
                        println!("❌ FAILED ({})", e);
                        failed += 1;
                    }
                }

                // Small delay between scenarios to avoid interference
                tokio::time::sleep(Duration::from_millis(500)).await;

                // Reset tester state between scenarios
                tester.reset();
            }

            println!("\n📊 Results: {} passed, {} failed", passed, failed);
            if failed > 0 {
                std::process::exit(1);
            }
        }

        Commands::Leaderboard { players } => {
            let count = players.clamp(2, 8);
            println!("🏟️  Simulating a round-robin among {} players...", count);

            let mut records = Vec::new();
            for i in 1..=count {
                records.push(tester.register_player(&format!("player_{}", i)).await?);
            }

            // Later players roll higher, so the standings are predictable
            let mut duel_ids = Vec::new();
            for i in 0..records.len() {
                for j in (i + 1)..records.len() {
                    tester
                        .challenge(&records[i].user_id, &records[j].user_id)
                        .await?;
                    if let JoinOutcome::Matched { match_id, .. } = tester
                        .challenge(&records[j].user_id, &records[i].user_id)
                        .await?
                    {
                        tester
                            .submit_roll(&match_id, &records[i].user_id, (i as u64 + 1) * 10)
                            .await?;
                        tester
                            .submit_roll(&match_id, &records[j].user_id, (j as u64 + 1) * 10)
                            .await?;
                        duel_ids.push(match_id);
                    }
                }
            }

            println!("⏳ {} duels running, waiting for resolution...", duel_ids.len());
            for match_id in &duel_ids {
                if tester
                    .wait_for_duel_end(match_id, Duration::from_secs(30))
                    .await
                    .is_none()
                {
                    eprintln!("❌ Duel {} did not resolve in time", match_id);
                    std::process::exit(1);
                }
            }

            let rows = tester.leaderboard().await?;
            println!("\n🏆 Final standings:");
            println!(
                "{:<4} {:<12} {:>5} {:>6} {:>7} {:>9}",
                "#", "Player", "Elo", "Wins", "Losses", "Winrate"
            );
            for (rank, row) in rows.iter().enumerate() {
                println!(
                    "{:<4} {:<12} {:>5} {:>6} {:>7} {:>8.1}%",
                    rank + 1,
                    row.username,
                    row.elo,
                    row.wins,
                    row.losses,
                    row.winrate
                );
            }

            let stats = tester.get_stats();
            println!(
                "\n📊 Tester stats: {} players, {} duels started, {} rolls submitted",
                stats.players_registered, stats.duels_started, stats.rolls_submitted
            );
        }
    }

    tester.shutdown().await;
    Ok(())
}
