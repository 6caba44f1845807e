//! `NotificationBus` (§4.10): synchronous in-process pub/sub. Subscribers
//! register for a single event kind or, with `None`, for everything.
//! Delivery happens inline inside `publish` — there is no queue or
//! background task — so a subscriber that panics must not take down the
//! publisher, and a subscriber that (un)subscribes from within its own
//! callback must not deadlock or corrupt iteration.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::events::{EventKind, NotificationEvent};

type Callback = dyn Fn(&NotificationEvent) + Send + Sync;

struct Subscription {
    kind: Option<EventKind>,
    callback: Arc<Callback>,
}

/// Returned by `subscribe`; pass back to `unsubscribe` to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

#[derive(Default)]
pub struct NotificationBus {
    subscribers: DashMap<Uuid, Subscription>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register for every event of `kind`, or every event at all when
    /// `kind` is `None`.
    pub fn subscribe(
        &self,
        kind: Option<EventKind>,
        callback: impl Fn(&NotificationEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = Uuid::new_v4();
        self.subscribers.insert(
            id,
            Subscription {
                kind,
                callback: Arc::new(callback),
            },
        );
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.remove(&id.0);
    }

    /// Deliver `event` to every matching subscriber synchronously. A
    /// snapshot of subscribers is taken up front so a callback that
    /// subscribes or unsubscribes does not observe a partially-mutated
    /// map or deadlock against the shard it is stored in.
    pub fn publish(&self, event: NotificationEvent) {
        let kind = event.kind();
        let snapshot: Vec<Arc<Callback>> = self
            .subscribers
            .iter()
            .filter(|entry| matches!(entry.kind, None | Some(k) if k == kind))
            .map(|entry| entry.callback.clone())
            .collect();

        for callback in snapshot {
            let event = &event;
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| callback(event)));
            if let Err(panic) = result {
                let message = panic_message(&panic);
                tracing::error!(error = %message, event = ?kind, "notification subscriber panicked");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EnrichmentCompleteEvent, QueueStatusEvent};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn enrichment_event() -> NotificationEvent {
        NotificationEvent::EnrichmentComplete(EnrichmentCompleteEvent {
            node_id: Uuid::new_v4(),
            success: true,
            hierarchy_updates: None,
            error_message: None,
            timestamp: Utc::now(),
        })
    }

    fn queue_event() -> NotificationEvent {
        NotificationEvent::QueueStatus(QueueStatusEvent {
            pending: 1,
            processing: 0,
            complete: 2,
            failed: 0,
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn global_subscriber_receives_every_kind() {
        let bus = NotificationBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.subscribe(None, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(enrichment_event());
        bus.publish(queue_event());

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn typed_subscriber_ignores_other_kinds() {
        let bus = NotificationBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.subscribe(Some(EventKind::QueueStatus), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(enrichment_event());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.publish(queue_event());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_stop_delivery_to_others() {
        let bus = NotificationBus::new();
        bus.subscribe(None, |_| panic!("boom"));

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.subscribe(None, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(enrichment_event());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let bus = NotificationBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = bus.subscribe(None, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(enrichment_event());
        bus.unsubscribe(id);
        bus.publish(enrichment_event());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribing_from_within_a_callback_does_not_deadlock() {
        let bus = Arc::new(NotificationBus::new());
        let inner = bus.clone();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.subscribe(None, move |_| {
            let c2 = c.clone();
            inner.subscribe(None, move |_| {
                c2.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.publish(enrichment_event());
        // the subscriber added during the first publish should not have
        // been part of that publish's snapshot
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.publish(enrichment_event());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
