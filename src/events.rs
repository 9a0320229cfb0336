//! Live dashboard events and the broadcast hub
//!
//! The hub is a thin wrapper over a `tokio::sync::broadcast` channel:
//! the subscriber set is owned by the channel itself, so subscribe,
//! unsubscribe (receiver drop) and fan-out are atomic with respect to
//! each other, and a slow or disconnected client can never block the
//! publisher or other subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::models::Alert;

/// Event pushed to connected dashboard clients.
///
/// Events for the same alert id are published in causal order:
/// `new_alert` at persist time, `score_update` when enrichment lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    NewAlert {
        alert: Alert,
    },
    ScoreUpdate {
        id: i64,
        ml_score: f64,
        explanation: Option<String>,
    },
}

impl DashboardEvent {
    /// SSE event name for this variant
    pub fn name(&self) -> &'static str {
        match self {
            DashboardEvent::NewAlert { .. } => "new_alert",
            DashboardEvent::ScoreUpdate { .. } => "score_update",
        }
    }
}

/// Broadcast hub for dashboard events
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<DashboardEvent>,
}

impl EventBroadcaster {
    /// Create a new hub buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        info!("Event broadcaster initialized with capacity {}", capacity);
        Self { tx }
    }

    /// Register a new subscriber. No past events are replayed; dropping
    /// the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    /// Deliver an event to every current subscriber, ignoring the case
    /// where nobody is connected.
    pub fn broadcast_lossy(&self, event: DashboardEvent) {
        match self.tx.send(event) {
            Ok(count) => debug!("Broadcast event to {} clients", count),
            Err(_) => debug!("Broadcast event dropped, no clients connected"),
        }
    }

    /// Current number of connected subscribers
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_update(id: i64) -> DashboardEvent {
        DashboardEvent::ScoreUpdate {
            id,
            ml_score: 42.0,
            explanation: Some("test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let hub = EventBroadcaster::new(16);
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();

        hub.broadcast_lossy(score_update(1));

        assert!(matches!(rx1.recv().await, Ok(DashboardEvent::ScoreUpdate { id: 1, .. })));
        assert!(matches!(rx2.recv().await, Ok(DashboardEvent::ScoreUpdate { id: 1, .. })));
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_poison_broadcast() {
        let hub = EventBroadcaster::new(16);
        let rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();
        assert_eq!(hub.client_count(), 2);

        drop(rx1);
        hub.broadcast_lossy(score_update(7));

        assert!(matches!(rx2.recv().await, Ok(DashboardEvent::ScoreUpdate { id: 7, .. })));
        assert_eq!(hub.client_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_silent() {
        let hub = EventBroadcaster::new(16);
        // must not panic or error
        hub.broadcast_lossy(score_update(3));
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn test_same_alert_events_arrive_in_publish_order() {
        let hub = EventBroadcaster::new(16);
        let mut rx = hub.subscribe();

        hub.broadcast_lossy(score_update(10));
        hub.broadcast_lossy(score_update(11));

        assert!(matches!(rx.recv().await, Ok(DashboardEvent::ScoreUpdate { id: 10, .. })));
        assert!(matches!(rx.recv().await, Ok(DashboardEvent::ScoreUpdate { id: 11, .. })));
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(score_update(5)).unwrap();
        assert_eq!(json["type"], "score_update");
        assert_eq!(json["id"], 5);
        assert_eq!(json["ml_score"], 42.0);
    }
}
