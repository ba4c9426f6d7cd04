//! # Live Event Feed
//!
//! Cross-thread fan-out of pipeline progress events.
//!
//! Stages running on blocking worker threads push [`LogEvent`]s into a
//! process-wide unbounded channel ([`FeedSender`]). A single consumer task
//! drains the channel and broadcasts each event to every connected
//! subscriber ([`SubscriberHub`]). Delivery is at-most-once: nothing is
//! persisted and late subscribers never see earlier events.

pub mod consumer;
pub mod event;
pub mod hub;

pub use consumer::spawn_consumer;
pub use event::{LogEvent, LogLevel};
pub use hub::{DeliveryReport, SubscriberHub};

use tokio::sync::mpsc;

/// Handle for emitting events into the feed from any thread.
///
/// Cheap to clone. Sending never blocks and never fails the caller: if the
/// consumer is gone the event is dropped.
#[derive(Debug, Clone)]
pub struct FeedSender {
    tx: mpsc::UnboundedSender<LogEvent>,
}

impl FeedSender {
    /// Emit an event. Errors (consumer gone) are swallowed.
    pub fn emit(&self, event: LogEvent) {
        let _ = self.tx.send(event);
    }

    /// Emit an info-level event from the named stage.
    pub fn info(&self, agent: &str, message: impl Into<String>) {
        self.emit(LogEvent::now(agent, message, LogLevel::Info));
    }

    /// Emit a warning-level event from the named stage.
    pub fn warning(&self, agent: &str, message: impl Into<String>) {
        self.emit(LogEvent::now(agent, message, LogLevel::Warning));
    }

    /// Emit an error-level event from the named stage.
    pub fn error(&self, agent: &str, message: impl Into<String>) {
        self.emit(LogEvent::now(agent, message, LogLevel::Error));
    }
}

/// Create the feed channel: one producer handle, one consumer end.
pub fn channel() -> (FeedSender, mpsc::UnboundedReceiver<LogEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FeedSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let (sender, mut rx) = channel();
        sender.info("orchestrator", "Pipeline started");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.agent, "orchestrator");
        assert_eq!(event.level, LogLevel::Info);
    }

    #[tokio::test]
    async fn test_emit_after_consumer_dropped_is_swallowed() {
        let (sender, rx) = channel();
        drop(rx);
        // Must not panic or error out.
        sender.error("trainer", "lost");
    }

    #[test]
    fn test_emit_from_plain_thread() {
        let (sender, mut rx) = channel();
        let handle = std::thread::spawn(move || {
            sender.info("data_inspection", "Scanning...");
        });
        handle.join().unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.agent, "data_inspection");
    }
}
