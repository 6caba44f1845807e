//! Batch import persistence (§[SUPPLEMENT] batch import): a bounded
//! (<=50 URL) list run independently through the Import Orchestrator, one
//! row per batch plus one row per URL, so `GET /api/batch-import/:id`
//! survives a process restart mid-batch. No transaction spans more than
//! one item update — batch items never roll each other back.

use chrono::Utc;
use curation_core::{
    BatchDetail, BatchImport, BatchImportItem, BatchItemStatus, BatchStats, BatchStatus,
    CurationResult, NodeId,
};
use uuid::Uuid;

use crate::error::from_sqlx;
use crate::model::{BatchItemRow, BatchRow};
use crate::NodeStore;

impl NodeStore {
    /// Create a batch row and one queued item per URL, in insertion order.
    pub async fn create_batch(&self, batch_id: Uuid, urls: &[String]) -> CurationResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO batch_imports (id, item_count, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(batch_id.to_string())
        .bind(urls.len() as i32)
        .bind(BatchStatus::Running.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        for (order, url) in urls.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO batch_import_items (batch_id, item_order, url, status)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(batch_id.to_string())
            .bind(order as i32)
            .bind(url)
            .bind(BatchItemStatus::Queued.as_str())
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx)?;
        }

        tx.commit().await.map_err(from_sqlx)?;
        Ok(())
    }

    /// Record the outcome of one item's independent run through the
    /// orchestrator. Marks the batch complete once every item has left
    /// `queued`.
    pub async fn update_batch_item(
        &self,
        batch_id: Uuid,
        item_order: i32,
        node_id: Option<NodeId>,
        error: Option<String>,
        status: BatchItemStatus,
    ) -> CurationResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;

        sqlx::query(
            r#"
            UPDATE batch_import_items
            SET node_id = ?, error = ?, status = ?
            WHERE batch_id = ? AND item_order = ?
            "#,
        )
        .bind(node_id.map(|id| id.to_string()))
        .bind(&error)
        .bind(status.as_str())
        .bind(batch_id.to_string())
        .bind(item_order)
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        let remaining: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM batch_import_items WHERE batch_id = ? AND status = ?",
        )
        .bind(batch_id.to_string())
        .bind(BatchItemStatus::Queued.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        if remaining == 0 {
            sqlx::query("UPDATE batch_imports SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(BatchStatus::Complete.as_str())
                .bind(&now)
                .bind(batch_id.to_string())
                .bind(BatchStatus::Running.as_str())
                .execute(&mut *tx)
                .await
                .map_err(from_sqlx)?;
        }

        tx.commit().await.map_err(from_sqlx)?;
        Ok(())
    }

    /// Mark every item still `queued` as `cancelled` and the batch as
    /// `cancelled`. Items already in flight or finished are untouched —
    /// cancellation stops future work, it doesn't roll back the past.
    pub async fn cancel_not_started_items(&self, batch_id: Uuid) -> CurationResult<u64> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;

        let result = sqlx::query(
            "UPDATE batch_import_items SET status = ? WHERE batch_id = ? AND status = ?",
        )
        .bind(BatchItemStatus::Cancelled.as_str())
        .bind(batch_id.to_string())
        .bind(BatchItemStatus::Queued.as_str())
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        sqlx::query("UPDATE batch_imports SET status = ?, updated_at = ? WHERE id = ?")
            .bind(BatchStatus::Cancelled.as_str())
            .bind(&now)
            .bind(batch_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx)?;

        tx.commit().await.map_err(from_sqlx)?;
        Ok(result.rows_affected())
    }

    pub async fn get_batch(&self, batch_id: Uuid) -> CurationResult<Option<BatchDetail>> {
        let batch_row = sqlx::query_as::<_, BatchRow>("SELECT * FROM batch_imports WHERE id = ?")
            .bind(batch_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;

        let Some(batch_row) = batch_row else {
            return Ok(None);
        };

        let item_rows = sqlx::query_as::<_, BatchItemRow>(
            "SELECT * FROM batch_import_items WHERE batch_id = ? ORDER BY item_order ASC",
        )
        .bind(batch_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx)?;

        let items: Vec<BatchImportItem> = item_rows.into_iter().map(BatchItemRow::into_item).collect();
        let stats = stats_for(&items);

        Ok(Some(BatchDetail {
            batch: batch_row.into_batch(),
            items,
            stats,
        }))
    }
}

fn stats_for(items: &[BatchImportItem]) -> BatchStats {
    let mut stats = BatchStats::default();
    for item in items {
        match item.status {
            BatchItemStatus::Queued => stats.queued += 1,
            BatchItemStatus::Succeeded => stats.succeeded += 1,
            BatchItemStatus::Failed => stats.failed += 1,
            BatchItemStatus::Cancelled => stats.cancelled += 1,
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_store() -> NodeStore {
        NodeStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn creates_batch_with_queued_items() {
        let store = test_store().await;
        let batch_id = Uuid::new_v4();
        store
            .create_batch(batch_id, &["https://a.example".to_string(), "https://b.example".to_string()])
            .await
            .unwrap();

        let detail = store.get_batch(batch_id).await.unwrap().unwrap();
        assert_eq!(detail.batch.item_count, 2);
        assert_eq!(detail.batch.status, BatchStatus::Running);
        assert_eq!(detail.stats.queued, 2);
        assert_eq!(detail.items[0].url, "https://a.example");
    }

    #[tokio::test]
    async fn completes_batch_once_every_item_resolves() {
        let store = test_store().await;
        let batch_id = Uuid::new_v4();
        store
            .create_batch(batch_id, &["https://a.example".to_string(), "https://b.example".to_string()])
            .await
            .unwrap();

        let node_id = Uuid::new_v4();
        store
            .update_batch_item(batch_id, 0, Some(node_id), None, BatchItemStatus::Succeeded)
            .await
            .unwrap();
        let mid = store.get_batch(batch_id).await.unwrap().unwrap();
        assert_eq!(mid.batch.status, BatchStatus::Running);

        store
            .update_batch_item(batch_id, 1, None, Some("fetch failed".to_string()), BatchItemStatus::Failed)
            .await
            .unwrap();
        let done = store.get_batch(batch_id).await.unwrap().unwrap();
        assert_eq!(done.batch.status, BatchStatus::Complete);
        assert_eq!(done.stats.succeeded, 1);
        assert_eq!(done.stats.failed, 1);
    }

    #[tokio::test]
    async fn cancel_marks_only_queued_items() {
        let store = test_store().await;
        let batch_id = Uuid::new_v4();
        store
            .create_batch(
                batch_id,
                &[
                    "https://a.example".to_string(),
                    "https://b.example".to_string(),
                    "https://c.example".to_string(),
                ],
            )
            .await
            .unwrap();
        store
            .update_batch_item(batch_id, 0, Some(Uuid::new_v4()), None, BatchItemStatus::Succeeded)
            .await
            .unwrap();

        let cancelled = store.cancel_not_started_items(batch_id).await.unwrap();
        assert_eq!(cancelled, 2);

        let detail = store.get_batch(batch_id).await.unwrap().unwrap();
        assert_eq!(detail.batch.status, BatchStatus::Cancelled);
        assert_eq!(detail.stats.succeeded, 1);
        assert_eq!(detail.stats.cancelled, 2);
    }

    #[tokio::test]
    async fn unknown_batch_returns_none() {
        let store = test_store().await;
        assert!(store.get_batch(Uuid::new_v4()).await.unwrap().is_none());
    }
}
