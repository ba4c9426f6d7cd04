//! Feed consumer: perpetual task draining the event channel into the hub.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;

use super::event::LogEvent;
use super::hub::SubscriberHub;

/// Idle backoff when the channel is empty
const IDLE_BACKOFF: Duration = Duration::from_millis(100);

/// Spawn the background consumer.
///
/// Drains events with `try_recv`, sleeping briefly when the channel is empty
/// instead of busy-spinning. Runs until every producer handle is dropped.
pub fn spawn_consumer(
    mut rx: mpsc::UnboundedReceiver<LogEvent>,
    hub: Arc<SubscriberHub>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    hub.broadcast(&event);
                }
                Err(TryRecvError::Empty) => {
                    tokio::time::sleep(IDLE_BACKOFF).await;
                }
                Err(TryRecvError::Disconnected) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed;

    #[tokio::test]
    async fn test_consumer_forwards_events_to_subscribers() {
        let hub = Arc::new(SubscriberHub::new());
        let mut rx_sub = hub.add("conn-1");

        let (sender, rx) = feed::channel();
        let handle = spawn_consumer(rx, Arc::clone(&hub));

        sender.info("model_selection", "Selected Model: efficientnet");

        let event = tokio::time::timeout(Duration::from_secs(2), rx_sub.recv())
            .await
            .expect("consumer should deliver within the backoff window")
            .unwrap();
        assert_eq!(event.agent, "model_selection");

        // Dropping the last producer terminates the consumer.
        drop(sender);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("consumer should exit once producers are gone")
            .unwrap();
    }
}
