//! Row shapes and the conversions between the raw SQL representation and
//! the shared domain model in `curation_core::types`.

use chrono::{DateTime, Utc};
use curation_core::{
    AuditEntry, BatchImport, BatchImportItem, BatchItemStatus, BatchStatus, ChangeType,
    HierarchyView, Job, JobPhase, JobStatus, MetadataRegistryEntry, MetadataType, Node, NodeId,
    TriggeredBy,
};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct NodeRow {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub source_domain: String,
    pub company: Option<String>,
    pub segment_code: String,
    pub category_code: String,
    pub content_type_code: String,
    pub organization_code: String,
    pub function_hierarchy_code: String,
    pub organization_hierarchy_code: String,
    pub extracted_fields: String,
    pub metadata_tags: String,
    pub short_description: Option<String>,
    pub phrase_description: Option<String>,
    pub ai_summary: Option<String>,
    pub key_concepts: String,
    pub descriptor: String,
    pub logo_url: Option<String>,
    pub is_deleted: i64,
    pub date_added: String,
    pub created_at: String,
    pub updated_at: String,
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_str_vec(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

impl NodeRow {
    pub fn into_node(self) -> Node {
        Node {
            id: Uuid::parse_str(&self.id).unwrap_or_else(|_| Uuid::nil()),
            title: self.title,
            source_url: self.source_url,
            source_domain: self.source_domain,
            company: self.company,
            extracted_fields: serde_json::from_str(&self.extracted_fields)
                .unwrap_or(serde_json::Value::Null),
            metadata_tags: parse_str_vec(&self.metadata_tags),
            ai_summary: self.ai_summary,
            phrase_description: self.phrase_description,
            short_description: self.short_description,
            key_concepts: parse_str_vec(&self.key_concepts),
            logo_url: self.logo_url,
            segment_code: self.segment_code,
            category_code: self.category_code,
            content_type_code: self.content_type_code,
            organization_code: self.organization_code,
            function_hierarchy_code: self.function_hierarchy_code,
            organization_hierarchy_code: self.organization_hierarchy_code,
            descriptor: self.descriptor,
            is_deleted: self.is_deleted != 0,
            date_added: parse_ts(&self.date_added),
            created_at: parse_ts(&self.created_at),
            updated_at: parse_ts(&self.updated_at),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RegistryRow {
    pub id: i64,
    pub r#type: String,
    pub code: String,
    pub display_name: String,
    pub description: Option<String>,
    pub usage_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl RegistryRow {
    pub fn into_entry(self) -> MetadataRegistryEntry {
        MetadataRegistryEntry {
            id: self.id,
            metadata_type: self.r#type.parse().unwrap_or(MetadataType::Fnc),
            code: self.code,
            display_name: self.display_name,
            description: self.description,
            usage_count: self.usage_count,
            created_at: parse_ts(&self.created_at),
            updated_at: parse_ts(&self.updated_at),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct JobRow {
    pub id: i64,
    pub node_id: String,
    pub phase: String,
    pub status: String,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    pub owner: Option<String>,
    pub claimed_at: Option<String>,
    pub created_at: String,
    pub processed_at: Option<String>,
    pub next_eligible_at: String,
}

impl JobRow {
    pub fn into_job(self) -> Job {
        Job {
            id: self.id,
            node_id: Uuid::parse_str(&self.node_id).unwrap_or_else(|_| Uuid::nil()),
            phase: self.phase.parse().unwrap_or(JobPhase::Phase2),
            status: self.status.parse().unwrap_or(JobStatus::Pending),
            priority: self.priority,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            last_error: self.error_message,
            owner: self.owner,
            created_at: parse_ts(&self.created_at),
            claimed_at: self.claimed_at.as_deref().map(parse_ts),
            processed_at: self.processed_at.as_deref().map(parse_ts),
            next_eligible_at: parse_ts(&self.next_eligible_at),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct BatchRow {
    pub id: String,
    pub item_count: i32,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl BatchRow {
    pub fn into_batch(self) -> BatchImport {
        BatchImport {
            id: Uuid::parse_str(&self.id).unwrap_or_else(|_| Uuid::nil()),
            item_count: self.item_count,
            status: self.status.parse().unwrap_or(BatchStatus::Running),
            created_at: parse_ts(&self.created_at),
            updated_at: parse_ts(&self.updated_at),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct BatchItemRow {
    pub batch_id: String,
    pub item_order: i32,
    pub url: String,
    pub node_id: Option<String>,
    pub error: Option<String>,
    pub status: String,
}

impl BatchItemRow {
    pub fn into_item(self) -> BatchImportItem {
        BatchImportItem {
            batch_id: Uuid::parse_str(&self.batch_id).unwrap_or_else(|_| Uuid::nil()),
            item_order: self.item_order,
            url: self.url,
            node_id: self.node_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
            error: self.error,
            status: self.status.parse().unwrap_or(BatchItemStatus::Queued),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AuditRow {
    pub id: i64,
    pub node_id: String,
    pub hierarchy_type: String,
    pub old_code: Option<String>,
    pub new_code: Option<String>,
    pub change_type: String,
    pub triggered_by: String,
    pub reason: Option<String>,
    pub related_node_ids: String,
    pub metadata: String,
    pub changed_at: String,
}

impl AuditRow {
    pub fn into_entry(self) -> AuditEntry {
        AuditEntry {
            id: self.id,
            node_id: Uuid::parse_str(&self.node_id).unwrap_or_else(|_| Uuid::nil()),
            hierarchy_type: self.hierarchy_type.parse().unwrap_or(HierarchyView::Function),
            old_code: self.old_code,
            new_code: self.new_code,
            change_type: parse_change_type(&self.change_type),
            triggered_by: parse_triggered_by(&self.triggered_by),
            reason: self.reason,
            related_node_ids: serde_json::from_str::<Vec<String>>(&self.related_node_ids)
                .unwrap_or_default()
                .iter()
                .filter_map(|s| Uuid::parse_str(s).ok())
                .collect(),
            metadata: serde_json::from_str(&self.metadata).unwrap_or(serde_json::Value::Null),
            changed_at: parse_ts(&self.changed_at),
        }
    }
}

fn parse_change_type(s: &str) -> ChangeType {
    match s {
        "created" => ChangeType::Created,
        "updated" => ChangeType::Updated,
        "moved" => ChangeType::Moved,
        "restructured" => ChangeType::Restructured,
        "merged" => ChangeType::Merged,
        _ => ChangeType::Deleted,
    }
}

fn parse_triggered_by(s: &str) -> TriggeredBy {
    match s {
        "import" => TriggeredBy::Import,
        "user_move" => TriggeredBy::UserMove,
        "restructure" => TriggeredBy::Restructure,
        "merge" => TriggeredBy::Merge,
        _ => TriggeredBy::Enrichment,
    }
}

/// A single hierarchy-code mutation produced by a restructure plan, applied
/// alongside the new node's own insert within one transaction.
#[derive(Debug, Clone)]
pub struct CodeMutation {
    pub node_id: NodeId,
    pub old_code: String,
    pub new_code: String,
    pub view: HierarchyView,
}
