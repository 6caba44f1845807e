//! In-process notification bus (C10, §4.10): synchronous pub/sub carrying
//! `enrichment_complete` and `queue_status` events from the Phase-2
//! worker pool and queue reaper to SSE subscribers and anything else
//! wired up at process boot.

mod bus;
mod events;

pub use bus::{NotificationBus, SubscriptionId};
pub use events::{EnrichmentCompleteEvent, EventKind, NotificationEvent, QueueStatusEvent};
