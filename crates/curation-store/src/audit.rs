use curation_core::{AuditEntry, CurationResult, NodeId};
use sqlx::SqlitePool;

use crate::error::from_sqlx;
use crate::model::AuditRow;

pub(crate) async fn for_node(pool: &SqlitePool, node_id: NodeId) -> CurationResult<Vec<AuditEntry>> {
    let rows = sqlx::query_as::<_, AuditRow>(
        "SELECT * FROM hierarchy_audit_log WHERE node_id = ? ORDER BY changed_at ASC",
    )
    .bind(node_id.to_string())
    .fetch_all(pool)
    .await
    .map_err(from_sqlx)?;
    Ok(rows.into_iter().map(AuditRow::into_entry).collect())
}
