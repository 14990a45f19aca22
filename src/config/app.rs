//! Main application configuration
//!
//! This module defines the primary configuration structures for the roll-arena
//! service, including environment variable loading, TOML file loading, and
//! validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub arena: ArenaSettings,
    pub rating: RatingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Enable the Prometheus metrics collector and health server
    pub enable_metrics: bool,
    /// Interval for the stats snapshot refresh task in seconds
    pub stats_interval_seconds: u64,
}

/// Duel lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    /// Full duration of a duel in milliseconds
    pub match_duration_ms: u64,
    /// Interval between expiry sweeps in milliseconds
    pub sweep_interval_ms: u64,
    /// How long finished duels stay cached in memory, in milliseconds
    pub finished_retention_ms: u64,
    /// Interval between finished-duel eviction passes in seconds
    pub eviction_interval_seconds: u64,
    /// Number of rows returned by the leaderboard
    pub leaderboard_limit: usize,
    /// Number of finished matches returned by a user's history
    pub history_limit: usize,
}

/// Elo rating settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    /// K-factor bounding the maximum rating swing per duel
    pub k_factor: f64,
    /// Rating assigned to newly registered users
    pub starting_elo: i32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "roll-arena".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
            enable_metrics: true,
            stats_interval_seconds: 30,
        }
    }
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            match_duration_ms: 120_000,      // 2 minutes
            sweep_interval_ms: 1_000,        // 1 second
            finished_retention_ms: 300_000,  // 5 minutes
            eviction_interval_seconds: 60,   // 1 minute
            leaderboard_limit: 100,
            history_limit: 20,
        }
    }
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            starting_elo: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            config.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(enable) = env::var("ENABLE_METRICS") {
            config.service.enable_metrics = enable
                .parse()
                .map_err(|_| anyhow!("Invalid ENABLE_METRICS value: {}", enable))?;
        }
        if let Ok(interval) = env::var("STATS_INTERVAL_SECONDS") {
            config.service.stats_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid STATS_INTERVAL_SECONDS value: {}", interval))?;
        }

        // Arena settings
        if let Ok(duration) = env::var("MATCH_DURATION_MS") {
            config.arena.match_duration_ms = duration
                .parse()
                .map_err(|_| anyhow!("Invalid MATCH_DURATION_MS value: {}", duration))?;
        }
        if let Ok(interval) = env::var("SWEEP_INTERVAL_MS") {
            config.arena.sweep_interval_ms = interval
                .parse()
                .map_err(|_| anyhow!("Invalid SWEEP_INTERVAL_MS value: {}", interval))?;
        }
        if let Ok(retention) = env::var("FINISHED_RETENTION_MS") {
            config.arena.finished_retention_ms = retention
                .parse()
                .map_err(|_| anyhow!("Invalid FINISHED_RETENTION_MS value: {}", retention))?;
        }
        if let Ok(interval) = env::var("EVICTION_INTERVAL_SECONDS") {
            config.arena.eviction_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid EVICTION_INTERVAL_SECONDS value: {}", interval))?;
        }
        if let Ok(limit) = env::var("LEADERBOARD_LIMIT") {
            config.arena.leaderboard_limit = limit
                .parse()
                .map_err(|_| anyhow!("Invalid LEADERBOARD_LIMIT value: {}", limit))?;
        }
        if let Ok(limit) = env::var("HISTORY_LIMIT") {
            config.arena.history_limit = limit
                .parse()
                .map_err(|_| anyhow!("Invalid HISTORY_LIMIT value: {}", limit))?;
        }

        // Rating settings
        if let Ok(k_factor) = env::var("ELO_K_FACTOR") {
            config.rating.k_factor = k_factor
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_K_FACTOR value: {}", k_factor))?;
        }
        if let Ok(elo) = env::var("STARTING_ELO") {
            config.rating.starting_elo = elo
                .parse()
                .map_err(|_| anyhow!("Invalid STARTING_ELO value: {}", elo))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, with defaults for missing sections
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get stats refresh interval as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.service.stats_interval_seconds)
    }

    /// Get full duel duration as Duration
    pub fn match_duration(&self) -> Duration {
        Duration::from_millis(self.arena.match_duration_ms)
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.arena.sweep_interval_ms)
    }

    /// Get finished-duel retention window as Duration
    pub fn finished_retention(&self) -> Duration {
        Duration::from_millis(self.arena.finished_retention_ms)
    }

    /// Get eviction interval as Duration
    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.arena.eviction_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.service.stats_interval_seconds == 0 {
        return Err(anyhow!("Stats interval must be greater than 0"));
    }

    // Validate arena settings
    if config.arena.match_duration_ms == 0 {
        return Err(anyhow!("Match duration must be greater than 0"));
    }
    if config.arena.sweep_interval_ms == 0 {
        return Err(anyhow!("Sweep interval must be greater than 0"));
    }
    if config.arena.eviction_interval_seconds == 0 {
        return Err(anyhow!("Eviction interval must be greater than 0"));
    }
    if config.arena.leaderboard_limit == 0 {
        return Err(anyhow!("Leaderboard limit must be greater than 0"));
    }
    if config.arena.history_limit == 0 {
        return Err(anyhow!("History limit must be greater than 0"));
    }

    // Validate rating settings
    if config.rating.k_factor <= 0.0 {
        return Err(anyhow!("K-factor must be positive"));
    }
    if config.rating.starting_elo <= 0 {
        return Err(anyhow!("Starting elo must be positive"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.arena.match_duration_ms, 120_000);
        assert_eq!(config.arena.sweep_interval_ms, 1_000);
        assert_eq!(config.rating.k_factor, 32.0);
        assert_eq!(config.rating.starting_elo, 1000);
    }

    #[test]
    fn test_duration_accessors() {
        let config = AppConfig::default();
        assert_eq!(config.match_duration(), Duration::from_millis(120_000));
        assert_eq!(config.sweep_interval(), Duration::from_millis(1_000));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [arena]
            match_duration_ms = 60000

            [rating]
            k_factor = 24.0
            "#,
        )
        .unwrap();

        assert_eq!(parsed.arena.match_duration_ms, 60_000);
        assert_eq!(parsed.arena.sweep_interval_ms, 1_000);
        assert_eq!(parsed.rating.k_factor, 24.0);
        assert_eq!(parsed.service.name, "roll-arena");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.service.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.arena.match_duration_ms = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.rating.k_factor = -1.0;
        assert!(validate_config(&config).is_err());
    }
}
