//! Subscriber hub: dynamic fan-out of feed events to live connections.
//!
//! Best-effort delivery. A subscriber whose channel has closed is skipped;
//! one dead subscriber never stops delivery to the rest.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;

use super::event::LogEvent;

/// Per-subscriber receiving end
pub type SubscriberReceiver = mpsc::UnboundedReceiver<LogEvent>;

/// Registry of connected live-feed subscribers
#[derive(Debug, Default)]
pub struct SubscriberHub {
    subscribers: RwLock<HashMap<String, mpsc::UnboundedSender<LogEvent>>>,
}

/// Outcome of one broadcast
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Events handed to a live subscriber channel
    pub delivered: usize,
    /// Subscribers whose channel was closed
    pub failed: usize,
}

impl SubscriberHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and return its event receiver.
    pub fn add(&self, subscriber_id: &str) -> SubscriberReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subs) = self.subscribers.write() {
            subs.insert(subscriber_id.to_string(), tx);
        }
        rx
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn remove(&self, subscriber_id: &str) {
        if let Ok(mut subs) = self.subscribers.write() {
            subs.remove(subscriber_id);
        }
    }

    /// Push one event to every currently connected subscriber.
    pub fn broadcast(&self, event: &LogEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        let subs = match self.subscribers.read() {
            Ok(s) => s,
            Err(_) => return report,
        };

        for sender in subs.values() {
            match sender.send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(_) => report.failed += 1,
            }
        }

        report
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }
}
