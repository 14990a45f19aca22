//! Client notification dispatch for outbound events
//!
//! Delivery is best effort. A notification to a user with no live
//! connection is dropped, and the caller only learns whether the event
//! was handed to a connection, never whether the client processed it.

use crate::types::{ClientEvent, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Trait for delivering events to connected clients
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an event to a user, returning whether a connection accepted it
    async fn notify(&self, user_id: &str, event: ClientEvent) -> bool;
}

/// Channel-backed notifier implementation
///
/// Each connected user owns one unbounded channel. Registering a user who
/// already has a connection replaces the old sender, which closes the
/// previous receiver's stream.
#[derive(Debug, Default)]
pub struct ChannelNotifier {
    connections: RwLock<HashMap<UserId, mpsc::UnboundedSender<ClientEvent>>>,
}

impl ChannelNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a user and return its event stream
    pub fn register_connection(&self, user_id: &str) -> mpsc::UnboundedReceiver<ClientEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();

        if let Ok(mut connections) = self.connections.write() {
            if connections.insert(user_id.to_string(), sender).is_some() {
                debug!("Replaced existing connection for user {}", user_id);
            }
        }

        receiver
    }

    /// Remove a user's connection, returning whether one was registered
    pub fn deregister_connection(&self, user_id: &str) -> bool {
        match self.connections.write() {
            Ok(mut connections) => connections.remove(user_id).is_some(),
            Err(_) => {
                warn!("Failed to acquire connections lock while deregistering");
                false
            }
        }
    }

    /// Whether a user currently has a registered connection
    pub fn is_connected(&self, user_id: &str) -> bool {
        self.connections
            .read()
            .map(|connections| connections.contains_key(user_id))
            .unwrap_or(false)
    }

    /// Number of registered connections (for monitoring)
    pub fn connection_count(&self) -> usize {
        self.connections
            .read()
            .map(|connections| connections.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, user_id: &str, event: ClientEvent) -> bool {
        let send_failed = {
            let connections = match self.connections.read() {
                Ok(connections) => connections,
                Err(_) => {
                    warn!("Failed to acquire connections lock while notifying");
                    return false;
                }
            };

            match connections.get(user_id) {
                Some(sender) => sender.send(event).is_err(),
                None => {
                    debug!("No connection for user {}, dropping event", user_id);
                    return false;
                }
            }
        };

        if send_failed {
            // Receiver gone without a deregister, drop the stale sender
            if let Ok(mut connections) = self.connections.write() {
                connections.remove(user_id);
            }
            debug!("Connection for user {} is closed, dropping event", user_id);
            return false;
        }

        true
    }
}

/// Mock notifier for testing
#[derive(Debug, Default)]
pub struct MockNotifier {
    notifications: std::sync::Mutex<Vec<(UserId, ClientEvent)>>,
    deliverable: std::sync::atomic::AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            notifications: std::sync::Mutex::new(Vec::new()),
            deliverable: std::sync::atomic::AtomicBool::new(true),
        }
    }

    /// Control whether notify reports successful delivery
    pub fn set_deliverable(&self, deliverable: bool) {
        self.deliverable
            .store(deliverable, std::sync::atomic::Ordering::SeqCst);
    }

    /// Get all recorded notifications (for testing)
    pub fn get_notifications(&self) -> Vec<(UserId, ClientEvent)> {
        self.notifications
            .lock()
            .map(|notifications| notifications.clone())
            .unwrap_or_default()
    }

    /// Get recorded events for one user (for testing)
    pub fn notifications_for(&self, user_id: &str) -> Vec<ClientEvent> {
        self.notifications
            .lock()
            .map(|notifications| {
                notifications
                    .iter()
                    .filter(|(recipient, _)| recipient == user_id)
                    .map(|(_, event)| event.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clear recorded notifications (for testing)
    pub fn clear_notifications(&self) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.clear();
        }
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, user_id: &str, event: ClientEvent) -> bool {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push((user_id.to_string(), event));
        }
        self.deliverable.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils;

    fn create_test_roll_event(score: u64) -> ClientEvent {
        ClientEvent::OpponentRoll { score }
    }

    #[tokio::test]
    async fn test_notify_delivers_to_registered_connection() {
        let notifier = ChannelNotifier::new();
        let mut receiver = notifier.register_connection("ARNG-AAAA1111");

        assert!(notifier.notify("ARNG-AAAA1111", create_test_roll_event(42)).await);

        let event = receiver.recv().await.unwrap();
        assert!(matches!(event, ClientEvent::OpponentRoll { score: 42 }));
    }

    #[tokio::test]
    async fn test_notify_without_connection_is_dropped() {
        let notifier = ChannelNotifier::new();
        assert!(!notifier.notify("ARNG-AAAA1111", create_test_roll_event(7)).await);
    }

    #[tokio::test]
    async fn test_reregister_replaces_connection() {
        let notifier = ChannelNotifier::new();
        let mut first = notifier.register_connection("ARNG-AAAA1111");
        let mut second = notifier.register_connection("ARNG-AAAA1111");

        assert_eq!(notifier.connection_count(), 1);
        assert!(notifier.notify("ARNG-AAAA1111", create_test_roll_event(9)).await);

        // Old stream is closed, new stream gets the event
        assert!(first.recv().await.is_none());
        assert!(matches!(
            second.recv().await,
            Some(ClientEvent::OpponentRoll { score: 9 })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver_prunes_connection() {
        let notifier = ChannelNotifier::new();
        let receiver = notifier.register_connection("ARNG-AAAA1111");
        drop(receiver);

        assert!(!notifier.notify("ARNG-AAAA1111", create_test_roll_event(1)).await);
        assert!(!notifier.is_connected("ARNG-AAAA1111"));
    }

    #[tokio::test]
    async fn test_deregister_connection() {
        let notifier = ChannelNotifier::new();
        let _receiver = notifier.register_connection("ARNG-AAAA1111");

        assert!(notifier.is_connected("ARNG-AAAA1111"));
        assert!(notifier.deregister_connection("ARNG-AAAA1111"));
        assert!(!notifier.deregister_connection("ARNG-AAAA1111"));
        assert_eq!(notifier.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_notifier_records_events() {
        let notifier = MockNotifier::new();
        let user_id = utils::generate_user_id();

        assert!(notifier.notify(&user_id, create_test_roll_event(10)).await);
        notifier
            .notify(
                &user_id,
                ClientEvent::MatchFound {
                    match_id: utils::generate_match_id(),
                    opponent: "ARNG-BBBB2222".to_string(),
                },
            )
            .await;

        let events = notifier.notifications_for(&user_id);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "opponent_roll");
        assert_eq!(events[1].event_type(), "match_found");

        notifier.set_deliverable(false);
        assert!(!notifier.notify(&user_id, create_test_roll_event(3)).await);

        notifier.clear_notifications();
        assert!(notifier.get_notifications().is_empty());
    }
}
