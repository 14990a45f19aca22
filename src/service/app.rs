//! Main application state and service coordination
//!
//! This module contains the production AppState that coordinates all
//! service components and background maintenance tasks.

use crate::config::AppConfig;
use crate::duel::DuelRegistry;
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::notify::ChannelNotifier;
use crate::queue::ChallengeQueue;
use crate::rating::{EloRatingCalculator, RatingCalculator};
use crate::roster::PlayerDirectory;
use crate::storage::{ArenaStore, InMemoryArenaStore};
use crate::types::ClientEvent;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Core arena components wired together during initialization
struct ArenaComponents {
    store: Arc<dyn ArenaStore>,
    notifier: Arc<ChannelNotifier>,
    registry: Arc<DuelRegistry>,
    queue: Arc<ChallengeQueue>,
    directory: Arc<PlayerDirectory>,
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Store backing user records and finished matches
    store: Arc<dyn ArenaStore>,

    /// Client event channels
    notifier: Arc<ChannelNotifier>,

    /// Live duel bookkeeping
    registry: Arc<DuelRegistry>,

    /// Mutual-challenge pairing queue
    queue: Arc<ChallengeQueue>,

    /// User registration, profiles, and standings
    directory: Arc<PlayerDirectory>,

    /// Metrics service for monitoring and health checks
    metrics_service: Arc<MetricsService>,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing roll-arena duel service");
        info!(
            "Configuration: service={}, health_port={}, match_duration={}ms",
            config.service.name, config.service.health_port, config.arena.match_duration_ms
        );

        // Initialize metrics service
        let metrics_service = Self::initialize_metrics(&config)?;

        // Initialize all core components with metrics
        let components = Self::initialize_arena_system(&config, metrics_service.collector())?;

        Ok(Self {
            config,
            store: components.store,
            notifier: components.notifier,
            registry: components.registry,
            queue: components.queue,
            directory: components.directory,
            metrics_service,
            background_tasks: Mutex::new(Vec::new()),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start all background services
    pub async fn start(&self) -> Result<(), ServiceError> {
        info!("Starting roll-arena duel service");

        // Mark as running
        *self.is_running.write().await = true;

        // Start metrics service first
        self.start_metrics_service().await?;

        // Start background tasks
        self.start_background_tasks().await?;

        info!("✅ Roll Arena duel service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of roll-arena service");

        // Mark as not running
        *self.is_running.write().await = false;

        // Stop background tasks (including metrics service task)
        self.stop_background_tasks().await;

        // Stop metrics service
        if self.config.service.enable_metrics {
            info!("Stopping metrics service...");
            if let Err(e) = self.metrics_service.stop().await {
                warn!("Failed to stop metrics service: {}", e);
            } else {
                info!("✅ Metrics service stopped");
            }
        }

        // Get final statistics
        let final_registry_stats =
            self.registry
                .get_stats()
                .await
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final registry stats: {}", e),
                })?;
        let final_queue_stats =
            self.queue
                .get_stats()
                .await
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final queue stats: {}", e),
                })?;

        info!("Final registry statistics: {:?}", final_registry_stats);
        info!("Final queue statistics: {:?}", final_queue_stats);
        info!("✅ Roll Arena service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the duel registry for operations
    pub fn registry(&self) -> Arc<DuelRegistry> {
        self.registry.clone()
    }

    /// Get the challenge queue for operations
    pub fn queue(&self) -> Arc<ChallengeQueue> {
        self.queue.clone()
    }

    /// Get the player directory for operations
    pub fn directory(&self) -> Arc<PlayerDirectory> {
        self.directory.clone()
    }

    /// Get the client event notifier
    pub fn notifier(&self) -> Arc<ChannelNotifier> {
        self.notifier.clone()
    }

    /// Get the backing store
    pub fn store(&self) -> Arc<dyn ArenaStore> {
        self.store.clone()
    }

    /// Get metrics service
    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    /// Wire this state into the health server once it lives behind an Arc
    ///
    /// The health server is owned by this state, so the link can only be
    /// established after construction.
    pub async fn attach_health_state(self: &Arc<Self>) {
        self.metrics_service
            .health_server()
            .attach_app_state(Arc::clone(self))
            .await;
    }

    /// Open an event stream for a client connection
    ///
    /// A second connection for the same user replaces the first.
    pub fn connect_client(&self, user_id: &str) -> mpsc::UnboundedReceiver<ClientEvent> {
        let receiver = self.notifier.register_connection(user_id);
        self.metrics_service
            .collector()
            .set_active_connections(self.notifier.connection_count());

        info!("Client '{}' connected", user_id);
        receiver
    }

    /// Tear down a client connection
    ///
    /// Drops the event channel and cancels any pending challenge ticket
    /// so the departed user cannot be paired against.
    pub fn handle_client_disconnect(&self, user_id: &str) -> crate::error::Result<()> {
        let had_connection = self.notifier.deregister_connection(user_id);
        let cancelled_ticket = self.queue.cancel(user_id)?;

        if had_connection || cancelled_ticket {
            info!(
                "Client '{}' disconnected - connection dropped: {}, ticket cancelled: {}",
                user_id, had_connection, cancelled_ticket
            );
        }

        self.metrics_service
            .collector()
            .set_active_connections(self.notifier.connection_count());

        Ok(())
    }

    /// Initialize metrics service
    fn initialize_metrics(config: &AppConfig) -> Result<Arc<MetricsService>, ServiceError> {
        info!(
            "Initializing metrics service on port {}",
            config.service.health_port
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let health_config = HealthServerConfig {
            port: config.service.health_port,
            host: "0.0.0.0".to_string(),
        };

        let health_server = Arc::new(HealthServer::new(health_config, metrics_collector.clone()));
        let metrics_service = Arc::new(MetricsService::new(metrics_collector, health_server));

        Ok(metrics_service)
    }

    /// Initialize the complete arena system
    fn initialize_arena_system(
        config: &AppConfig,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<ArenaComponents, ServiceError> {
        info!("Initializing arena system components");

        // Initialize rating system
        let rating_calculator: Arc<dyn RatingCalculator> = Arc::new(
            EloRatingCalculator::new(config.rating.clone()).map_err(|e| {
                ServiceError::Initialization {
                    message: format!("Failed to initialize rating calculator: {}", e),
                }
            })?,
        );

        // Initialize storage and client notification channels
        let store: Arc<dyn ArenaStore> = Arc::new(InMemoryArenaStore::new());
        let notifier = Arc::new(ChannelNotifier::new());

        // Initialize the duel registry
        let registry = Arc::new(DuelRegistry::with_metrics(
            store.clone(),
            notifier.clone(),
            rating_calculator,
            config.arena.clone(),
            metrics_collector.clone(),
        ));

        // Initialize the challenge queue on top of the registry
        let queue = Arc::new(ChallengeQueue::with_metrics(
            registry.clone(),
            store.clone(),
            notifier.clone(),
            metrics_collector.clone(),
        ));

        // Initialize the player directory
        let directory = Arc::new(PlayerDirectory::with_metrics(
            store.clone(),
            config.arena.clone(),
            config.rating.clone(),
            metrics_collector,
        ));

        Ok(ArenaComponents {
            store,
            notifier,
            registry,
            queue,
            directory,
        })
    }

    /// Start metrics service
    async fn start_metrics_service(&self) -> Result<(), ServiceError> {
        if !self.config.service.enable_metrics {
            info!("Metrics disabled - skipping health server startup");
            return Ok(());
        }

        info!("Starting metrics and health endpoints");

        // Clone necessary references for the background task
        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.health_port;

        // Spawn the metrics service as a background task
        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });

        // Add the handle to background tasks for proper shutdown
        self.background_tasks.lock().await.push(metrics_handle);

        // Give the server a moment to start up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    /// Start background maintenance tasks
    async fn start_background_tasks(&self) -> Result<(), ServiceError> {
        info!("Starting background maintenance tasks...");

        // Expired duel sweep task
        info!(
            "Starting duel sweep task ({}ms interval)...",
            self.config.arena.sweep_interval_ms
        );
        let sweep_task = {
            let registry = self.registry.clone();
            let sweep_interval = self.config.sweep_interval();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(sweep_interval);
                info!("Duel sweep task started");

                while *is_running.read().await {
                    interval.tick().await;

                    match registry.sweep_expired().await {
                        Ok(resolved) => {
                            if resolved > 0 {
                                debug!("Sweep resolved {} expired duels", resolved);
                            }
                        }
                        Err(e) => {
                            warn!("Duel sweep failed: {}", e);
                        }
                    }
                }

                info!("Duel sweep task stopped");
            })
        };

        // Finished duel eviction task
        info!(
            "Starting duel eviction task ({}s interval)...",
            self.config.eviction_interval().as_secs()
        );
        let eviction_task = {
            let registry = self.registry.clone();
            let eviction_interval = self.config.eviction_interval();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(eviction_interval);
                info!("Duel eviction task started");

                while *is_running.read().await {
                    interval.tick().await;

                    match registry.evict_finished().await {
                        Ok(evicted) => {
                            if evicted > 0 {
                                info!("Evicted {} finished duels from memory", evicted);
                            } else {
                                debug!("Eviction check completed - no finished duels to evict");
                            }
                        }
                        Err(e) => {
                            warn!("Duel eviction failed: {}", e);
                        }
                    }
                }

                info!("Duel eviction task stopped");
            })
        };

        // Service stats and health metrics task
        info!(
            "Starting stats refresh task ({}s interval)...",
            self.config.stats_interval().as_secs()
        );
        let stats_task = {
            let registry = self.registry.clone();
            let queue = self.queue.clone();
            let store = self.store.clone();
            let notifier = self.notifier.clone();
            let metrics_collector = self.metrics_service.collector();
            let stats_interval = self.config.stats_interval();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(stats_interval);
                let start_time = tokio::time::Instant::now();
                info!("Stats refresh task started");

                while *is_running.read().await {
                    interval.tick().await;

                    // Update service uptime
                    let uptime_seconds = start_time.elapsed().as_secs() as i64;
                    metrics_collector
                        .service()
                        .uptime_seconds
                        .set(uptime_seconds);

                    // Resync gauges against live component state
                    metrics_collector.set_active_connections(notifier.connection_count());

                    let registry_healthy = match registry.get_stats().await {
                        Ok(stats) => {
                            debug!(
                                "Stats refresh - active duels: {}, resolved: {}",
                                stats.active_duels, stats.duels_resolved
                            );
                            metrics_collector.set_active_duels(stats.active_duels);
                            true
                        }
                        Err(e) => {
                            warn!("Failed to get registry stats for refresh: {}", e);
                            false
                        }
                    };

                    let queue_healthy = match queue.get_stats().await {
                        Ok(stats) => {
                            metrics_collector.set_waiting_tickets(stats.tickets_waiting);
                            true
                        }
                        Err(e) => {
                            warn!("Failed to get queue stats for refresh: {}", e);
                            false
                        }
                    };

                    let store_healthy = store.user_count().await.is_ok();

                    metrics_collector.update_component_health("duel_registry", registry_healthy);
                    metrics_collector.update_component_health("challenge_queue", queue_healthy);
                    metrics_collector.update_component_health("arena_store", store_healthy);

                    let status = if registry_healthy && queue_healthy && store_healthy {
                        2
                    } else {
                        1
                    };
                    metrics_collector.update_health_status(status);
                }

                info!("Stats refresh task stopped");
            })
        };

        // Add tasks to background handles
        let mut background_tasks = self.background_tasks.lock().await;
        background_tasks.push(sweep_task);
        background_tasks.push(eviction_task);
        background_tasks.push(stats_task);

        info!("3 background maintenance tasks started successfully");
        Ok(())
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&self) {
        let mut background_tasks = self.background_tasks.lock().await;
        let task_count = background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        // Cancel all background tasks
        for (i, task) in background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }
        drop(background_tasks);

        // Give tasks time to clean up gracefully
        info!("Waiting for background tasks to complete shutdown...");
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        info!("✅ All {} background tasks stopped", task_count);
    }
}
