//! Event emission.
//!
//! Events are broadcast to in-process subscribers. Each subscriber has an
//! independent buffer; slow subscribers lag rather than block emitters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "CoinsEarned", "DaemonStarted").
    pub event_type: String,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(event_type: &str, timestamp: u64, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            timestamp,
            payload,
        }
    }
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "economy", "video", "system".
    pub categories: Option<Vec<String>>,
    /// Only events whose payload names one of these users.
    pub user_ids: Option<Vec<String>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref categories) = self.categories {
            let category = categorize_event(&event.event_type);
            if !categories.iter().any(|c| c == category) {
                return false;
            }
        }

        if let Some(ref user_ids) = self.user_ids {
            match event.payload.get("user_id").and_then(|v| v.as_str()) {
                Some(uid) if user_ids.iter().any(|id| id == uid) => {}
                _ => return false,
            }
        }

        true
    }
}

/// Categorize an event type into a category.
pub fn categorize_event(event_type: &str) -> &'static str {
    match event_type {
        "CoinsEarned" | "MilestoneClaimed" | "ReferralRedeemed" | "WithdrawalRequested"
        | "WithdrawalConfirmed" => "economy",
        s if s.starts_with("Video") => "video",
        _ => "system",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(Event::new(
            "DaemonStarted",
            1000,
            serde_json::json!({"version": "0.1.0"}),
        ));

        let event = rx.try_recv().expect("receive event");
        assert_eq!(event.event_type, "DaemonStarted");
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(Event::new("CoinsEarned", 1, serde_json::json!({})));
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter {
            categories: Some(vec!["economy".to_string()]),
            user_ids: Some(vec!["u1".to_string()]),
        };

        let mine = Event::new("CoinsEarned", 1, serde_json::json!({"user_id": "u1"}));
        assert!(filter.matches(&mine));

        let theirs = Event::new("CoinsEarned", 1, serde_json::json!({"user_id": "u2"}));
        assert!(!filter.matches(&theirs));

        let video = Event::new("VideoUploaded", 1, serde_json::json!({"user_id": "u1"}));
        assert!(!filter.matches(&video));

        assert!(EventFilter::default().matches(&video));
    }

    #[test]
    fn test_categorize_event() {
        assert_eq!(categorize_event("CoinsEarned"), "economy");
        assert_eq!(categorize_event("WithdrawalConfirmed"), "economy");
        assert_eq!(categorize_event("VideoUploaded"), "video");
        assert_eq!(categorize_event("VideoDeleted"), "video");
        assert_eq!(categorize_event("DaemonStarted"), "system");
    }
}
