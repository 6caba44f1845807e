use chrono::{DateTime, Utc};
use curation_core::{Job, JobPhase, JobStatus, NodeId};
use uuid::Uuid;

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

pub(crate) fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_node_id(s: &str) -> NodeId {
    Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil())
}

impl JobRow {
    pub fn into_job(self) -> Job {
        Job {
            id: self.id,
            node_id: parse_node_id(&self.node_id),
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
