//! Wire shapes for one import: the options an orchestrator caller can
//! tune and the result it reports back (§4.8).

use curation_core::{Classification, NodeId};
use serde::Serialize;

/// `forceRefresh` bypasses the classifier's cache for a re-fetch of a URL
/// that's already been imported; `createQueueJob` (default true) lets a
/// caller skip Phase 2 entirely for a dry-run import.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub force_refresh: bool,
    pub create_queue_job: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            create_queue_job: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyCodes {
    pub function: String,
    pub organization: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub node_id: NodeId,
    /// True when the URL was already imported and this call returned the
    /// existing node rather than running the pipeline again.
    pub cached: bool,
    pub classification: Classification,
    pub hierarchy_codes: HierarchyCodes,
    pub metadata: serde_json::Value,
    pub phase2_queued: bool,
    pub phase2_job_id: Option<i64>,
}
