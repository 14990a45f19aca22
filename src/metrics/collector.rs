//! Metrics collection using Prometheus
//!
//! This module provides comprehensive metrics collection for the roll-arena
//! service using Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the arena service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Challenge queue metrics
    queue_metrics: QueueMetrics,

    /// Duel lifecycle metrics
    duel_metrics: DuelMetrics,

    /// Rating calculation metrics
    rating_metrics: RatingMetrics,

    /// Notification delivery metrics
    notification_metrics: NotificationMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Total users registered
    pub users_registered_total: IntCounter,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Challenge queue metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Total join requests by outcome
    pub join_requests_total: IntCounterVec,

    /// Total cancellations that removed a ticket
    pub cancellations_total: IntCounter,

    /// Tickets currently waiting for reciprocation
    pub tickets_waiting: IntGauge,

    /// Time a ticket waited before its pairing completed
    pub pairing_wait_seconds: Histogram,
}

/// Duel lifecycle metrics
#[derive(Clone)]
pub struct DuelMetrics {
    /// Total duels created
    pub duels_created_total: IntCounter,

    /// Total rolls by result
    pub rolls_total: IntCounterVec,

    /// Total duels resolved by outcome
    pub duels_resolved_total: IntCounterVec,

    /// Total finished duels evicted from memory
    pub duels_evicted_total: IntCounter,

    /// Active duels currently in memory
    pub active_duels: IntGauge,

    /// Wall-clock duel length from start to resolution
    pub duel_duration_seconds: Histogram,
}

/// Rating calculation metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Total rating calculations by status
    pub rating_calculations_total: IntCounterVec,

    /// Rating calculation time
    pub rating_calculation_duration: Histogram,
}

/// Notification delivery metrics
#[derive(Clone)]
pub struct NotificationMetrics {
    /// Total notifications by event type and delivery result
    pub notifications_total: IntCounterVec,

    /// Client connections currently registered
    pub active_connections: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let duel_metrics = DuelMetrics::new(&registry)?;
        let rating_metrics = RatingMetrics::new(&registry)?;
        let notification_metrics = NotificationMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            duel_metrics,
            rating_metrics,
            notification_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get queue metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Get duel metrics
    pub fn duel(&self) -> &DuelMetrics {
        &self.duel_metrics
    }

    /// Get rating metrics
    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    /// Get notification metrics
    pub fn notification(&self) -> &NotificationMetrics {
        &self.notification_metrics
    }

    /// Record a user registration
    pub fn record_user_registered(&self) {
        self.service_metrics.users_registered_total.inc();
    }

    /// Record a join request being handled
    pub fn record_queue_join(&self, matched: bool) {
        let outcome = if matched { "matched" } else { "waiting" };

        self.queue_metrics
            .join_requests_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a cancellation that removed a ticket
    pub fn record_queue_cancel(&self) {
        self.queue_metrics.cancellations_total.inc();
    }

    /// Update the waiting-ticket gauge
    pub fn set_waiting_tickets(&self, count: usize) {
        self.queue_metrics.tickets_waiting.set(count as i64);
    }

    /// Record how long a ticket waited before pairing
    pub fn record_pairing_wait(&self, duration: Duration) {
        self.queue_metrics
            .pairing_wait_seconds
            .observe(duration.as_secs_f64());
    }

    /// Record a duel being created
    pub fn record_duel_created(&self) {
        self.duel_metrics.duels_created_total.inc();
    }

    /// Record a roll submission
    pub fn record_roll(&self, accepted: bool) {
        let result = if accepted { "accepted" } else { "ignored" };

        self.duel_metrics
            .rolls_total
            .with_label_values(&[result])
            .inc();
    }

    /// Record a duel resolving
    pub fn record_duel_resolved(&self, is_draw: bool, duration: Duration) {
        let outcome = if is_draw { "draw" } else { "decisive" };

        self.duel_metrics
            .duels_resolved_total
            .with_label_values(&[outcome])
            .inc();

        self.duel_metrics
            .duel_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Record finished duels being evicted
    pub fn record_duels_evicted(&self, count: u64) {
        self.duel_metrics.duels_evicted_total.inc_by(count);
    }

    /// Update the active-duel gauge
    pub fn set_active_duels(&self, count: usize) {
        self.duel_metrics.active_duels.set(count as i64);
    }

    /// Record a rating calculation
    pub fn record_rating_calculation(&self, success: bool, duration: Duration) {
        let status = if success { "success" } else { "error" };

        self.rating_metrics
            .rating_calculations_total
            .with_label_values(&[status])
            .inc();

        self.rating_metrics
            .rating_calculation_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a notification attempt
    pub fn record_notification(&self, event_type: &str, delivered: bool) {
        let delivered_str = if delivered { "yes" } else { "no" };

        self.notification_metrics
            .notifications_total
            .with_label_values(&[event_type, delivered_str])
            .inc();
    }

    /// Update the registered-connection gauge
    pub fn set_active_connections(&self, count: usize) {
        self.notification_metrics
            .active_connections
            .set(count as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("roll_arena_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let users_registered_total = IntCounter::new(
            "roll_arena_users_registered_total",
            "Total users registered",
        )?;
        registry.register(Box::new(users_registered_total.clone()))?;

        let health_status = IntGauge::new(
            "roll_arena_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("roll_arena_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            users_registered_total,
            health_status,
            component_health,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let join_requests_total = IntCounterVec::new(
            Opts::new("roll_arena_join_requests_total", "Total join requests"),
            &["outcome"],
        )?;
        registry.register(Box::new(join_requests_total.clone()))?;

        let cancellations_total = IntCounter::new(
            "roll_arena_cancellations_total",
            "Total queue cancellations",
        )?;
        registry.register(Box::new(cancellations_total.clone()))?;

        let tickets_waiting = IntGauge::new(
            "roll_arena_tickets_waiting",
            "Tickets currently waiting for reciprocation",
        )?;
        registry.register(Box::new(tickets_waiting.clone()))?;

        let pairing_wait_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "roll_arena_pairing_wait_seconds",
                "Ticket wait time before pairing",
            )
            .buckets(vec![0.1, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
        )?;
        registry.register(Box::new(pairing_wait_seconds.clone()))?;

        Ok(Self {
            join_requests_total,
            cancellations_total,
            tickets_waiting,
            pairing_wait_seconds,
        })
    }
}

impl DuelMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let duels_created_total =
            IntCounter::new("roll_arena_duels_created_total", "Total duels created")?;
        registry.register(Box::new(duels_created_total.clone()))?;

        let rolls_total = IntCounterVec::new(
            Opts::new("roll_arena_rolls_total", "Total roll submissions"),
            &["result"],
        )?;
        registry.register(Box::new(rolls_total.clone()))?;

        let duels_resolved_total = IntCounterVec::new(
            Opts::new("roll_arena_duels_resolved_total", "Total duels resolved"),
            &["outcome"],
        )?;
        registry.register(Box::new(duels_resolved_total.clone()))?;

        let duels_evicted_total = IntCounter::new(
            "roll_arena_duels_evicted_total",
            "Total finished duels evicted from memory",
        )?;
        registry.register(Box::new(duels_evicted_total.clone()))?;

        let active_duels =
            IntGauge::new("roll_arena_active_duels", "Active duels in memory")?;
        registry.register(Box::new(active_duels.clone()))?;

        let duel_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "roll_arena_duel_duration_seconds",
                "Duel length from start to resolution",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 90.0, 120.0, 180.0]),
        )?;
        registry.register(Box::new(duel_duration_seconds.clone()))?;

        Ok(Self {
            duels_created_total,
            rolls_total,
            duels_resolved_total,
            duels_evicted_total,
            active_duels,
            duel_duration_seconds,
        })
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rating_calculations_total = IntCounterVec::new(
            Opts::new(
                "roll_arena_rating_calculations_total",
                "Total rating calculations",
            ),
            &["status"],
        )?;
        registry.register(Box::new(rating_calculations_total.clone()))?;

        let rating_calculation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "roll_arena_rating_calculation_duration_seconds",
                "Rating calculation time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(rating_calculation_duration.clone()))?;

        Ok(Self {
            rating_calculations_total,
            rating_calculation_duration,
        })
    }
}

impl NotificationMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let notifications_total = IntCounterVec::new(
            Opts::new("roll_arena_notifications_total", "Total notifications"),
            &["event_type", "delivered"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        let active_connections = IntGauge::new(
            "roll_arena_active_connections",
            "Client connections currently registered",
        )?;
        registry.register(Box::new(active_connections.clone()))?;

        Ok(Self {
            notifications_total,
            active_connections,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        // Test that we can access all metric groups
        let _service = collector.service();
        let _queue = collector.queue();
        let _duel = collector.duel();
        let _rating = collector.rating();
        let _notification = collector.notification();
    }

    #[test]
    fn test_queue_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_queue_join(false);
        collector.record_queue_join(true);
        collector.record_queue_cancel();
        collector.set_waiting_tickets(3);
        collector.record_pairing_wait(Duration::from_millis(250));

        assert_eq!(collector.queue().tickets_waiting.get(), 3);
        assert_eq!(
            collector
                .queue()
                .join_requests_total
                .with_label_values(&["matched"])
                .get(),
            1
        );
    }

    #[test]
    fn test_duel_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_duel_created();
        collector.record_roll(true);
        collector.record_roll(false);
        collector.record_duel_resolved(false, Duration::from_secs(120));
        collector.record_duels_evicted(2);
        collector.set_active_duels(1);

        assert_eq!(collector.duel().duels_created_total.get(), 1);
        assert_eq!(collector.duel().duels_evicted_total.get(), 2);
        assert_eq!(
            collector
                .duel()
                .rolls_total
                .with_label_values(&["ignored"])
                .get(),
            1
        );
    }

    #[test]
    fn test_rating_and_notification_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_rating_calculation(true, Duration::from_nanos(1000));
        collector.record_rating_calculation(false, Duration::from_nanos(1000));
        collector.record_notification("match_end", true);
        collector.record_notification("opponent_roll", false);
        collector.set_active_connections(4);

        assert_eq!(
            collector
                .rating()
                .rating_calculations_total
                .with_label_values(&["error"])
                .get(),
            1
        );
        assert_eq!(collector.notification().active_connections.get(), 4);
    }

    #[test]
    fn test_health_status_updates() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.update_health_status(2); // Healthy
        collector.update_component_health("duel_registry", true);
        collector.update_component_health("store", false);
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}
