//! The domain model shared by every component: nodes, hierarchy codes,
//! metadata codes, jobs, and audit entries. See `taxonomy` for the fixed
//! letter-code sets that classification and hierarchy validate against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Opaque 128-bit node identifier. Assigned at creation, never reused.
pub type NodeId = Uuid;

/// The two independent hierarchies over the same set of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyView {
    Function,
    Organization,
}

impl HierarchyView {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Organization => "organization",
        }
    }
}

impl std::fmt::Display for HierarchyView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HierarchyView {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(Self::Function),
            "organization" => Ok(Self::Organization),
            _ => Err(anyhow::anyhow!("unknown hierarchy view: {s}")),
        }
    }
}

/// Output of Phase-1 classification, already clamped to the fixed sets
/// (see `taxonomy`). `from_cache` and `reasoning` are informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub segment: char,
    pub category: String,
    pub content_type: char,
    pub organization: String,
    pub confidence: f32,
    pub reasoning: Option<String>,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(default)]
    pub fallback: bool,
}

/// A new node before persistence — the Import Orchestrator's handoff to
/// the Node Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDraft {
    pub title: String,
    pub source_url: String,
    pub source_domain: String,
    pub company: Option<String>,
    pub extracted_fields: serde_json::Value,
    pub classification: Classification,
    pub metadata_tags: Vec<String>,
}

/// The central curated item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    pub source_url: String,
    pub source_domain: String,
    pub company: Option<String>,
    pub extracted_fields: serde_json::Value,
    pub metadata_tags: Vec<String>,
    pub ai_summary: Option<String>,
    pub phrase_description: Option<String>,
    pub short_description: Option<String>,
    pub key_concepts: Vec<String>,
    pub logo_url: Option<String>,

    pub segment_code: String,
    pub category_code: String,
    pub content_type_code: String,
    pub organization_code: String,
    pub function_hierarchy_code: String,
    pub organization_hierarchy_code: String,

    pub descriptor: String,
    pub is_deleted: bool,
    pub date_added: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    pub fn hierarchy_code(&self, view: HierarchyView) -> &str {
        match view {
            HierarchyView::Function => &self.function_hierarchy_code,
            HierarchyView::Organization => &self.organization_hierarchy_code,
        }
    }

    /// Recompute the descriptor string used for lexical search ranking.
    /// Called whenever any contributing field changes.
    pub fn rebuild_descriptor(&mut self) {
        let mut parts = vec![self.title.clone(), self.source_domain.clone()];
        if let Some(c) = &self.company {
            parts.push(c.clone());
        }
        if let Some(s) = &self.short_description {
            parts.push(s.clone());
        }
        if let Some(p) = &self.phrase_description {
            parts.push(p.clone());
        }
        if let Some(a) = &self.ai_summary {
            parts.push(a.clone());
        }
        parts.extend(self.key_concepts.iter().cloned());
        parts.extend(self.metadata_tags.iter().cloned());
        self.descriptor = parts.join(" ");
    }
}

/// A patch applied to a node by an update call or the enricher. `None`
/// fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDelta {
    pub title: Option<String>,
    pub company: Option<String>,
    pub ai_summary: Option<String>,
    pub phrase_description: Option<String>,
    pub short_description: Option<String>,
    pub key_concepts: Option<Vec<String>>,
    pub logo_url: Option<String>,
    pub extracted_fields: Option<serde_json::Value>,
}

/// A typed tag in the metadata registry. `(type, code)` is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataType {
    Org,
    Dom,
    Fnc,
    Tec,
    Con,
    Ind,
    Aud,
    Prc,
    Lic,
    Lng,
    Plt,
    Seg,
    Cat,
    Typ,
}

impl MetadataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Org => "ORG",
            Self::Dom => "DOM",
            Self::Fnc => "FNC",
            Self::Tec => "TEC",
            Self::Con => "CON",
            Self::Ind => "IND",
            Self::Aud => "AUD",
            Self::Prc => "PRC",
            Self::Lic => "LIC",
            Self::Lng => "LNG",
            Self::Plt => "PLT",
            Self::Seg => "SEG",
            Self::Cat => "CAT",
            Self::Typ => "TYP",
        }
    }
}

impl std::str::FromStr for MetadataType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ORG" => Ok(Self::Org),
            "DOM" => Ok(Self::Dom),
            "FNC" => Ok(Self::Fnc),
            "TEC" => Ok(Self::Tec),
            "CON" => Ok(Self::Con),
            "IND" => Ok(Self::Ind),
            "AUD" => Ok(Self::Aud),
            "PRC" => Ok(Self::Prc),
            "LIC" => Ok(Self::Lic),
            "LNG" => Ok(Self::Lng),
            "PLT" => Ok(Self::Plt),
            "SEG" => Ok(Self::Seg),
            "CAT" => Ok(Self::Cat),
            "TYP" => Ok(Self::Typ),
            _ => Err(anyhow::anyhow!("unknown metadata type: {s}")),
        }
    }
}

/// A (type, code) pair to attach to a node, with the confidence and
/// subsystem that asserted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataCode {
    pub metadata_type: MetadataType,
    pub code: String,
    pub confidence: f32,
    pub source: String,
}

impl MetadataCode {
    /// Normalize a raw tag string to the registry's canonical form:
    /// UPPERCASE alphanumeric + underscore, 2..=50 chars.
    pub fn normalize_code(raw: &str) -> String {
        let upper = raw.trim().to_uppercase().replace(' ', "_");
        let filtered: String = upper
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        filtered.chars().take(50).collect()
    }
}

/// A registry entry: the canonical (type, code) with display metadata and
/// a usage count maintained transactionally by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRegistryEntry {
    pub id: i64,
    pub metadata_type: MetadataType,
    pub code: String,
    pub display_name: String,
    pub description: Option<String>,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deferred-work phase. Only `Phase2` exists today; the enum leaves room
/// for future phases without a schema migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Phase2,
}

impl JobPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phase2 => "phase2",
        }
    }
}

impl std::str::FromStr for JobPhase {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phase2" => Ok(Self::Phase2),
            _ => Err(anyhow::anyhow!("unknown job phase: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            _ => Err(anyhow::anyhow!("unknown job status: {s}")),
        }
    }
}

/// Status of a batch import run (§[SUPPLEMENT] batch import).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Running,
    Complete,
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(anyhow::anyhow!("unknown batch status: {s}")),
        }
    }
}

/// Status of a single URL within a batch import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    Queued,
    Succeeded,
    Failed,
    Cancelled,
}

impl BatchItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BatchItemStatus {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(anyhow::anyhow!("unknown batch item status: {s}")),
        }
    }
}

/// A bounded (<=50 URL) batch import run. Items execute independently
/// through the Import Orchestrator; there is no transactional coupling
/// between them, only a shared summary row for progress polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImport {
    pub id: Uuid,
    pub item_count: i32,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportItem {
    pub batch_id: Uuid,
    pub item_order: i32,
    pub url: String,
    pub node_id: Option<NodeId>,
    pub error: Option<String>,
    pub status: BatchItemStatus,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub queued: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub cancelled: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDetail {
    pub batch: BatchImport,
    pub items: Vec<BatchImportItem>,
    pub stats: BatchStats,
}

/// A unit of deferred work in the Processing Queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub node_id: NodeId,
    pub phase: JobPhase,
    pub status: JobStatus,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub next_eligible_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Updated,
    Moved,
    Restructured,
    Merged,
    Deleted,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Moved => "moved",
            Self::Restructured => "restructured",
            Self::Merged => "merged",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
    Import,
    UserMove,
    Restructure,
    Merge,
    Enrichment,
}

impl TriggeredBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::UserMove => "user_move",
            Self::Restructure => "restructure",
            Self::Merge => "merge",
            Self::Enrichment => "enrichment",
        }
    }
}

/// Append-only record of a hierarchy-code or metadata change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub node_id: NodeId,
    pub hierarchy_type: HierarchyView,
    pub old_code: Option<String>,
    pub new_code: Option<String>,
    pub change_type: ChangeType,
    pub triggered_by: TriggeredBy,
    pub reason: Option<String>,
    pub related_node_ids: Vec<NodeId>,
    pub metadata: serde_json::Value,
    pub changed_at: DateTime<Utc>,
}

/// Redact any value whose key looks like it carries a secret. Applied at
/// every log site and audit body before the value is persisted or printed.
pub fn redact(key: &str, value: &str) -> String {
    let lower = key.to_lowercase();
    let is_secret = ["key", "password", "secret", "token", "credential"]
        .iter()
        .any(|needle| lower.contains(needle));
    if is_secret {
        "<redacted>".to_string()
    } else {
        value.to_string()
    }
}

/// Redact an entire context map in place for logging/audit purposes.
pub fn redact_map(map: &HashMap<String, String>) -> HashMap<String, String> {
    map.iter()
        .map(|(k, v)| (k.clone(), redact(k, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_secret_like_keys() {
        assert_eq!(redact("api_key", "sk-abc123"), "<redacted>");
        assert_eq!(redact("PASSWORD", "hunter2"), "<redacted>");
        assert_eq!(redact("title", "hello"), "hello");
    }

    #[test]
    fn normalizes_metadata_codes() {
        assert_eq!(MetadataCode::normalize_code(" machine learning! "), "MACHINE_LEARNING");
        assert_eq!(MetadataCode::normalize_code("a"), "A");
    }
}
