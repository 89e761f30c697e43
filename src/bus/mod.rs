//! In-process message bus standing in for the Pub/Sub-style topics the
//! pipeline is built around (`watch_events`, `state_estimates`).
//!
//! Backed by bounded `tokio::mpsc` channels, one per topic, instead of an
//! external broker. This preserves the contract the rest of the pipeline
//! is written against — at-least-once delivery, no ordering guarantee
//! across users, idempotent consumers — while keeping the crate free of a
//! real broker dependency. `MessageBus` is a trait so a broker-backed
//! implementation could be dropped in later without touching the ingestion,
//! estimator, or selector stages.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

pub mod topics {
    pub const WATCH_EVENTS: &str = "watch_events";
    pub const STATE_ESTIMATES: &str = "state_estimates";
}

#[async_trait]
pub trait MessageBus<T>: Send + Sync
where
    T: Send + 'static,
{
    /// Publishes a message to the topic. Failures are logged by the caller
    /// and never propagated as a request failure — the dedup claim has
    /// already been made durable by the time this is called.
    async fn publish(&self, message: T) -> anyhow::Result<()>;
}

/// A single bounded-channel topic. Cloning shares the same underlying
/// channel, matching `tokio::mpsc::Sender`'s own clone semantics.
pub struct InMemoryTopic<T> {
    sender: mpsc::Sender<T>,
}

impl<T> Clone for InMemoryTopic<T> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<T: Send + 'static> InMemoryTopic<T> {
    /// Creates a bounded topic and its paired receiver. `capacity` bounds
    /// how far a producer can run ahead of its consumer before `publish`
    /// starts applying backpressure.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<T>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl<T: Send + 'static> MessageBus<T> for InMemoryTopic<T> {
    async fn publish(&self, message: T) -> anyhow::Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| anyhow::anyhow!("topic receiver dropped"))
    }
}

/// Trigger payload published on the `watch_events` topic once a batch has
/// been durably persisted and dedup-claimed.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct WatchEventsTrigger {
    pub user_id: String,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub trace_id: String,
    pub total_samples: usize,
}

/// Trigger payload published on the `state_estimates` topic once the
/// estimator has produced a new row for a user.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct StateEstimateTrigger {
    pub user_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub trace_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_delivers_to_the_paired_receiver() {
        let (topic, mut receiver) = InMemoryTopic::<WatchEventsTrigger>::new(4);
        topic
            .publish(WatchEventsTrigger {
                user_id: "u1".into(),
                fetched_at: chrono::Utc::now(),
                trace_id: "t".into(),
                total_samples: 3,
            })
            .await
            .unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.user_id, "u1");
    }

    #[tokio::test]
    async fn publish_fails_once_receiver_is_dropped() {
        let (topic, receiver) = InMemoryTopic::<WatchEventsTrigger>::new(1);
        drop(receiver);
        let result = topic
            .publish(WatchEventsTrigger {
                user_id: "u1".into(),
                fetched_at: chrono::Utc::now(),
                trace_id: "t".into(),
                total_samples: 0,
            })
            .await;
        assert!(result.is_err());
    }
}
