//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`AssetEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application;
//! subscribers own their `Receiver` and drop it to unsubscribe, so there
//! is no listener registry to leak.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use spritemill_core::types::{AssetType, GenerationResult, Priority};

// ---------------------------------------------------------------------------
// AssetEvent
// ---------------------------------------------------------------------------

/// A lifecycle event emitted by the generation pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AssetEvent {
    /// A job entered the queue.
    JobQueued {
        job_id: Uuid,
        asset_type: AssetType,
        priority: Priority,
        session_id: Option<String>,
    },

    /// A job execution attempt started.
    JobStarted {
        job_id: Uuid,
        /// 1-based attempt number (retries increment this).
        attempt: u32,
    },

    /// A job finished successfully.
    JobCompleted {
        job_id: Uuid,
        result: GenerationResult,
    },

    /// A job exhausted its retries (or failed fatally).
    JobFailed { job_id: Uuid, error: String },

    /// A request was served from the cache without touching a provider.
    CacheHit { cache_key: String },

    /// A request missed the cache and will be generated.
    CacheMiss { cache_key: String },
}

impl AssetEvent {
    /// Dot-separated event name, e.g. `"job.completed"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JobQueued { .. } => "job.queued",
            Self::JobStarted { .. } => "job.started",
            Self::JobCompleted { .. } => "job.completed",
            Self::JobFailed { .. } => "job.failed",
            Self::CacheHit { .. } => "cache.hit",
            Self::CacheMiss { .. } => "cache.miss",
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`AssetEvent`].
pub struct EventBus {
    sender: broadcast::Sender<AssetEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: AssetEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<AssetEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(AssetEvent::CacheHit {
            cache_key: "abc123".into(),
        });

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.name(), "cache.hit");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let job_id = Uuid::new_v4();
        bus.publish(AssetEvent::JobFailed {
            job_id,
            error: "provider timed out".into(),
        });

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.name(), "job.failed");
        assert_eq!(e2.name(), "job.failed");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(AssetEvent::CacheMiss {
            cache_key: "deadbeef".into(),
        });
    }

    #[test]
    fn event_names_are_dot_separated() {
        let job_id = Uuid::new_v4();
        let event = AssetEvent::JobStarted { job_id, attempt: 1 };
        assert_eq!(event.name(), "job.started");
    }
}
