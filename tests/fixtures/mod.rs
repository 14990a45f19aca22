//! Test fixtures and mock implementations for integration testing

use async_trait::async_trait;
use roll_arena::notify::Notifier;
use roll_arena::types::{ClientEvent, UserId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Recording notifier that simulates live connections
///
/// Events for connected users are captured for inspection; events for
/// everyone else are dropped and counted, matching the best-effort
/// contract of the production notifier.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    online: Arc<Mutex<HashSet<UserId>>>,
    delivered_events: Arc<Mutex<Vec<(UserId, ClientEvent)>>>,
    dropped_events: Arc<Mutex<u64>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a user as having a live connection
    pub fn connect(&self, user_id: &str) {
        if let Ok(mut online) = self.online.lock() {
            online.insert(user_id.to_string());
        }
    }

    /// Drop a user's connection
    pub fn disconnect(&self, user_id: &str) {
        if let Ok(mut online) = self.online.lock() {
            online.remove(user_id);
        }
    }

    /// Get all delivered events (for testing)
    pub fn get_delivered_events(&self) -> Vec<(UserId, ClientEvent)> {
        self.delivered_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Delivered events for one user, in delivery order
    pub fn events_for(&self, user_id: &str) -> Vec<ClientEvent> {
        self.get_delivered_events()
            .into_iter()
            .filter(|(recipient, _)| recipient == user_id)
            .map(|(_, event)| event)
            .collect()
    }

    /// Count delivered events of a specific type
    pub fn count_events_of_type(&self, event_type: &str) -> usize {
        self.get_delivered_events()
            .iter()
            .filter(|(_, event)| event.event_type() == event_type)
            .count()
    }

    /// Number of events dropped for lack of a connection
    pub fn dropped_count(&self) -> u64 {
        self.dropped_events.lock().map(|count| *count).unwrap_or(0)
    }

    /// Clear recorded events between test phases
    pub fn clear(&self) {
        if let Ok(mut events) = self.delivered_events.lock() {
            events.clear();
        }
        if let Ok(mut dropped) = self.dropped_events.lock() {
            *dropped = 0;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: &str, event: ClientEvent) -> bool {
        let online = self
            .online
            .lock()
            .map(|online| online.contains(user_id))
            .unwrap_or(false);

        if !online {
            if let Ok(mut dropped) = self.dropped_events.lock() {
                *dropped += 1;
            }
            return false;
        }

        if let Ok(mut events) = self.delivered_events.lock() {
            events.push((user_id.to_string(), event));
        }
        true
    }
}
