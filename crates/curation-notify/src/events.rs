//! Event payloads emitted on the bus (§4.10). Serialization matches the
//! wire shape used for `/api/events` SSE frames: a tagged JSON object
//! with `type` set to the snake_case event name.

use chrono::{DateTime, Utc};
use curation_core::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    EnrichmentComplete,
    QueueStatus,
}

/// Emitted once a Phase-2 job reaches a terminal state for its node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentCompleteEvent {
    pub node_id: NodeId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy_updates: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Emitted whenever queue counts are recomputed (reaper sweep, worker
/// pool cycle, or an explicit status request).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatusEvent {
    pub pending: i64,
    pub processing: i64,
    pub complete: i64,
    pub failed: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    EnrichmentComplete(EnrichmentCompleteEvent),
    QueueStatus(QueueStatusEvent),
}

impl NotificationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::EnrichmentComplete(_) => EventKind::EnrichmentComplete,
            Self::QueueStatus(_) => EventKind::QueueStatus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrichment_complete_serializes_with_type_tag() {
        let event = NotificationEvent::EnrichmentComplete(EnrichmentCompleteEvent {
            node_id: uuid::Uuid::nil(),
            success: true,
            hierarchy_updates: None,
            error_message: None,
            timestamp: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "enrichment_complete");
        assert!(json.get("hierarchyUpdates").is_none());
    }
}
