//! `GET /api/events`: server-sent events bridging the in-process
//! `NotificationBus` (§4.10) to long-lived HTTP clients. Each connection
//! gets its own unbounded channel; the bus callback feeds it, and the
//! subscription is torn down once the client disconnects and the
//! stream is dropped.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::mpsc;

use curation_notify::{NotificationBus, NotificationEvent, SubscriptionId};

use crate::state::AppState;

struct SubscriptionGuard {
    notifier: Arc<NotificationBus>,
    id: SubscriptionId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.notifier.unsubscribe(self.id);
    }
}

pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationEvent>();
    let notifier = state.notifier.clone();
    let id = notifier.subscribe(None, move |event| {
        let _ = tx.send(event.clone());
    });
    let guard = SubscriptionGuard {
        notifier,
        id,
    };

    let events = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            yield Ok(Event::default().event(event_name(&event)).data(data));
        }
    };

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn event_name(event: &NotificationEvent) -> &'static str {
    match event {
        NotificationEvent::EnrichmentComplete(_) => "enrichment_complete",
        NotificationEvent::QueueStatus(_) => "queue_status",
    }
}
