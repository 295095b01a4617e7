//! Fan-out of notifications to every registered subscriber.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, warn};

use crate::{Notification, Subscriber, SubscriberId};

/// Capability the engine uses to publish lifecycle events.
///
/// Fire-and-forget: implementations must swallow delivery problems.
pub trait Notifier: Send + Sync {
    fn broadcast(&self, notification: Notification);
}

/// Notifier that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn broadcast(&self, _notification: Notification) {}
}

/// Concurrency-safe subscriber registry.
///
/// A subscriber that is closed, or whose `send` fails, is removed from the
/// set; the remaining subscribers still receive the message.
#[derive(Default)]
pub struct Broadcaster {
    next_id: AtomicU64,
    subscribers: Mutex<BTreeMap<SubscriberId, Arc<dyn Subscriber>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and return its id.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, subscriber);
        debug!(subscriber = id, "subscriber added");
        id
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(subscriber = id, "subscriber removed");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<SubscriberId, Arc<dyn Subscriber>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for Broadcaster {
    fn broadcast(&self, notification: Notification) {
        let message = match serde_json::to_string(&notification) {
            Ok(m) => m,
            Err(e) => {
                error!(event = %notification.event, "failed to encode notification: {e}");
                return;
            }
        };

        self.lock().retain(|id, subscriber| {
            if !subscriber.is_open() {
                debug!(subscriber = id, "dropping closed subscriber");
                return false;
            }
            match subscriber.send(*id, &message) {
                Ok(()) => true,
                Err(e) => {
                    warn!(subscriber = id, "dropping subscriber: {e}");
                    false
                }
            }
        });
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn broadcast(&self, notification: Notification) {
        (**self).broadcast(notification)
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelSubscriber, EventType, NotifyError};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    /// Fails on its first `send`, succeeds afterwards.
    struct FlakySubscriber {
        attempts: AtomicUsize,
    }

    impl Subscriber for FlakySubscriber {
        fn is_open(&self) -> bool {
            true
        }

        fn send(&self, id: SubscriberId, _message: &str) -> Result<(), NotifyError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(NotifyError::Delivery {
                    id,
                    message: "connection reset".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn started() -> Notification {
        Notification::new(EventType::WorkflowStarted, json!({ "workflowId": "wf" }))
    }

    #[test]
    fn delivers_encoded_message_to_every_subscriber() {
        let hub = Broadcaster::new();
        let (a, mut rx_a) = ChannelSubscriber::new();
        let (b, mut rx_b) = ChannelSubscriber::new();
        hub.subscribe(Arc::new(a));
        hub.subscribe(Arc::new(b));

        hub.broadcast(started());

        for rx in [&mut rx_a, &mut rx_b] {
            let msg: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(msg["type"], "WORKFLOW_STARTED");
            assert_eq!(msg["data"]["workflowId"], "wf");
        }
    }

    #[test]
    fn failing_subscriber_is_dropped_without_blocking_others() {
        let hub = Broadcaster::new();
        let flaky = Arc::new(FlakySubscriber {
            attempts: AtomicUsize::new(0),
        });
        let (healthy, mut rx) = ChannelSubscriber::new();
        hub.subscribe(flaky.clone());
        hub.subscribe(Arc::new(healthy));

        hub.broadcast(started());
        assert_eq!(hub.subscriber_count(), 1, "flaky subscriber removed");
        assert!(rx.try_recv().is_ok());

        hub.broadcast(Notification::new(EventType::WorkflowCompleted, json!({})));
        assert!(rx.try_recv().is_ok(), "second broadcast still delivered");
        assert_eq!(flaky.attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_channel_is_pruned() {
        let hub = Broadcaster::new();
        let (sub, rx) = ChannelSubscriber::new();
        hub.subscribe(Arc::new(sub));
        drop(rx);

        hub.broadcast(started());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn broadcast_without_subscribers_is_a_no_op() {
        Broadcaster::new().broadcast(started());
    }

    #[test]
    fn unsubscribe_removes_only_that_subscriber() {
        let hub = Broadcaster::new();
        let (a, _rx_a) = ChannelSubscriber::new();
        let (b, _rx_b) = ChannelSubscriber::new();
        let id_a = hub.subscribe(Arc::new(a));
        hub.subscribe(Arc::new(b));

        assert!(hub.unsubscribe(id_a));
        assert!(!hub.unsubscribe(id_a));
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_broadcasts_from_multiple_tasks() {
        let hub = Arc::new(Broadcaster::new());
        let (sub, mut rx) = ChannelSubscriber::new();
        hub.subscribe(Arc::new(sub));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let hub = Arc::clone(&hub);
                tokio::spawn(async move { hub.broadcast(started()) })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 8);
    }
}
