//! The Processing Queue (C8): a storage-backed work queue over the
//! `processing_queue` table owned by the Node Store's schema. Not an
//! in-memory channel — every state transition is a row update so a crash
//! loses no queued work.

mod backoff;
mod error;
mod model;
pub mod reaper;

pub use backoff::backoff;
pub use reaper::Reaper;

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;

use curation_core::{CurationError, CurationResult, ErrorKind, Job, JobPhase, JobStatus, NodeId};
use curation_notify::{NotificationBus, NotificationEvent, QueueStatusEvent};
use curation_store::{PaginatedResult, Pagination};

use crate::error::from_sqlx;
use crate::model::JobRow;

#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub backoff_base_secs: u64,
    pub backoff_ceiling_secs: u64,
    pub visibility_timeout_secs: i64,
    pub default_max_attempts: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backoff_base_secs: 1,
            backoff_ceiling_secs: 300,
            visibility_timeout_secs: 600,
            default_max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub phase: Option<JobPhase>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueueStats {
    pub pending: i64,
    pub processing: i64,
    pub complete: i64,
    pub failed: i64,
}

#[derive(Clone)]
pub struct Queue {
    pool: SqlitePool,
    config: QueueConfig,
    notifier: Option<Arc<NotificationBus>>,
}

impl Queue {
    pub fn new(pool: SqlitePool, config: QueueConfig) -> Self {
        Self {
            pool,
            config,
            notifier: None,
        }
    }

    /// Attach the notification bus this queue publishes `queue_status`
    /// events to (§4.6: `complete` and, by extension, `fail` — both
    /// change the counts a `queue_status` subscriber cares about).
    pub fn with_notifier(mut self, notifier: Arc<NotificationBus>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    async fn publish_queue_status(&self) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        match self.get_stats().await {
            Ok(stats) => notifier.publish(NotificationEvent::QueueStatus(QueueStatusEvent {
                pending: stats.pending,
                processing: stats.processing,
                complete: stats.complete,
                failed: stats.failed,
                timestamp: Utc::now(),
            })),
            Err(error) => {
                tracing::warn!(%error, "failed to recompute queue stats for queue_status event")
            }
        }
    }

    /// Upserts so there is at most one active job per `(node_id, phase)`:
    /// returns the existing id unchanged if one is pending/processing,
    /// otherwise replaces any complete/failed row and inserts fresh.
    pub async fn enqueue(
        &self,
        node_id: NodeId,
        phase: JobPhase,
        priority: i32,
        max_attempts: Option<i32>,
    ) -> CurationResult<i64> {
        let existing = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM processing_queue WHERE node_id = ? AND phase = ? \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(node_id.to_string())
        .bind(phase.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?;

        if let Some(row) = &existing {
            let status: JobStatus = row.status.parse().unwrap_or(JobStatus::Pending);
            if matches!(status, JobStatus::Pending | JobStatus::Processing) {
                return Ok(row.id);
            }
            sqlx::query("DELETE FROM processing_queue WHERE id = ?")
                .bind(row.id)
                .execute(&self.pool)
                .await
                .map_err(from_sqlx)?;
        }

        let now = Utc::now();
        let max_attempts = max_attempts.unwrap_or(self.config.default_max_attempts);
        let id = sqlx::query(
            "INSERT INTO processing_queue \
             (node_id, phase, status, priority, attempts, max_attempts, created_at, next_eligible_at) \
             VALUES (?, ?, 'pending', ?, 0, ?, ?, ?)",
        )
        .bind(node_id.to_string())
        .bind(phase.as_str())
        .bind(priority)
        .bind(max_attempts)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?
        .last_insert_rowid();

        Ok(id)
    }

    /// Atomically selects the highest-priority pending job (oldest first
    /// as a tiebreaker) whose `next_eligible_at` has passed, and claims it.
    pub async fn claim(&self, worker_id: &str) -> CurationResult<Option<Job>> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;
        let now = Utc::now();

        let candidate = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM processing_queue WHERE status = 'pending' AND next_eligible_at <= ? \
             ORDER BY priority DESC, created_at ASC LIMIT 1",
        )
        .bind(now.to_rfc3339())
        .fetch_optional(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        let Some(candidate) = candidate else {
            tx.commit().await.map_err(from_sqlx)?;
            return Ok(None);
        };

        let result = sqlx::query(
            "UPDATE processing_queue SET status = 'processing', claimed_at = ?, owner = ?, \
             attempts = attempts + 1 WHERE id = ? AND status = 'pending'",
        )
        .bind(now.to_rfc3339())
        .bind(worker_id)
        .bind(candidate.id)
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        if result.rows_affected() == 0 {
            tx.commit().await.map_err(from_sqlx)?;
            return Ok(None);
        }

        let claimed = sqlx::query_as::<_, JobRow>("SELECT * FROM processing_queue WHERE id = ?")
            .bind(candidate.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(from_sqlx)?;

        tx.commit().await.map_err(from_sqlx)?;
        Ok(Some(claimed.into_job()))
    }

    pub async fn complete(&self, job_id: i64) -> CurationResult<()> {
        sqlx::query(
            "UPDATE processing_queue SET status = 'complete', processed_at = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?;
        self.publish_queue_status().await;
        Ok(())
    }

    /// Retryable failures go back to `pending` with a backed-off
    /// `next_eligible_at`, as long as attempts remain; otherwise the job
    /// is terminally `failed`.
    pub async fn fail(&self, job_id: i64, error: &str, retryable: bool) -> CurationResult<()> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM processing_queue WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?
            .ok_or_else(|| CurationError::new(ErrorKind::ResourceNotFound, "job not found"))?;

        if retryable && row.attempts < row.max_attempts {
            let delay = backoff(
                row.attempts,
                self.config.backoff_base_secs,
                self.config.backoff_ceiling_secs,
            );
            let next_eligible_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
            sqlx::query(
                "UPDATE processing_queue SET status = 'pending', error_message = ?, \
                 next_eligible_at = ? WHERE id = ?",
            )
            .bind(error)
            .bind(next_eligible_at.to_rfc3339())
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;
        } else {
            sqlx::query(
                "UPDATE processing_queue SET status = 'failed', error_message = ?, \
                 processed_at = ? WHERE id = ?",
            )
            .bind(error)
            .bind(Utc::now().to_rfc3339())
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;
        }
        self.publish_queue_status().await;
        Ok(())
    }

    /// Refuses if the job is currently `processing` — a worker may still
    /// be acting on it.
    pub async fn cancel(&self, job_id: i64) -> CurationResult<()> {
        let row = self.get_job(job_id).await?.ok_or_else(|| {
            CurationError::new(ErrorKind::ResourceNotFound, "job not found")
        })?;
        if row.status == JobStatus::Processing {
            return Err(CurationError::new(
                ErrorKind::InvalidInput,
                "cannot cancel a job that is currently processing",
            ));
        }
        sqlx::query("DELETE FROM processing_queue WHERE id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;
        Ok(())
    }

    pub async fn retry(&self, job_id: i64) -> CurationResult<()> {
        let row = self.get_job(job_id).await?.ok_or_else(|| {
            CurationError::new(ErrorKind::ResourceNotFound, "job not found")
        })?;
        if row.status != JobStatus::Failed {
            return Err(CurationError::new(
                ErrorKind::InvalidInput,
                "only a failed job can be retried",
            ));
        }
        sqlx::query(
            "UPDATE processing_queue SET status = 'pending', attempts = 0, error_message = NULL, \
             next_eligible_at = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(())
    }

    pub async fn get_job(&self, job_id: i64) -> CurationResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM processing_queue WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;
        Ok(row.map(JobRow::into_job))
    }

    pub async fn get_jobs_for_node(&self, node_id: NodeId) -> CurationResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM processing_queue WHERE node_id = ? ORDER BY created_at DESC",
        )
        .bind(node_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(rows.into_iter().map(JobRow::into_job).collect())
    }

    pub async fn list_jobs(
        &self,
        filter: &JobFilter,
        page: u32,
        limit: u32,
    ) -> CurationResult<PaginatedResult<Job>> {
        let limit = limit.clamp(1, 100);
        let page = page.max(1);
        let offset = (page - 1) * limit;

        let mut where_clauses = Vec::new();
        if let Some(status) = filter.status {
            where_clauses.push(format!("status = '{}'", status.as_str()));
        }
        if let Some(phase) = filter.phase {
            where_clauses.push(format!("phase = '{}'", phase.as_str()));
        }
        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM processing_queue {where_sql}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .fetch_one(&self.pool)
            .await
            .map_err(from_sqlx)?;

        let rows_sql = format!(
            "SELECT * FROM processing_queue {where_sql} ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, JobRow>(&rows_sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx)?;

        Ok(PaginatedResult {
            data: rows.into_iter().map(JobRow::into_job).collect(),
            pagination: Pagination::new(page, limit, total as u64),
        })
    }

    /// Janitor sweep: deletes `complete` jobs older than `older_than`
    /// (defaults to the configured retention if `None`).
    pub async fn clear_completed(&self, older_than: chrono::DateTime<Utc>) -> CurationResult<u64> {
        let result = sqlx::query(
            "DELETE FROM processing_queue WHERE status = 'complete' AND processed_at < ?",
        )
        .bind(older_than.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(result.rows_affected())
    }

    pub async fn get_stats(&self) -> CurationResult<QueueStats> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM processing_queue GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx)?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => stats.pending = count,
                "processing" => stats.processing = count,
                "complete" => stats.complete = count,
                "failed" => stats.failed = count,
                _ => {}
            }
        }
        Ok(stats)
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// `processing` jobs whose `claimed_at` is older than `older_than` —
    /// candidates for the reaper to recover.
    pub async fn find_stale_processing(&self, older_than: chrono::DateTime<Utc>) -> CurationResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM processing_queue WHERE status = 'processing' AND claimed_at < ?",
        )
        .bind(older_than.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(rows.into_iter().map(JobRow::into_job).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_store::NodeStore;
    use uuid::Uuid;

    async fn queue() -> Queue {
        let store = NodeStore::connect("sqlite::memory:").await.unwrap();
        Queue::new(store.pool().clone(), QueueConfig::default())
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_while_live() {
        let q = queue().await;
        let node_id = Uuid::new_v4();
        let id1 = q.enqueue(node_id, JobPhase::Phase2, 0, None).await.unwrap();
        let id2 = q.enqueue(node_id, JobPhase::Phase2, 0, None).await.unwrap();
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn claim_picks_highest_priority_then_oldest() {
        let q = queue().await;
        let low = q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, None).await.unwrap();
        let high = q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 5, None).await.unwrap();
        let claimed = q.claim("worker-1").await.unwrap().unwrap();
        assert_eq!(claimed.id, high);
        assert_ne!(claimed.id, low);
    }

    #[tokio::test]
    async fn complete_marks_job_done() {
        let q = queue().await;
        let id = q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, None).await.unwrap();
        q.claim("worker-1").await.unwrap();
        q.complete(id).await.unwrap();
        let job = q.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert!(job.processed_at.is_some());
    }

    #[tokio::test]
    async fn retryable_failure_goes_back_to_pending() {
        let q = queue().await;
        let id = q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, Some(5)).await.unwrap();
        q.claim("worker-1").await.unwrap();
        q.fail(id, "transient", true).await.unwrap();
        let job = q.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 1);
    }

    #[tokio::test]
    async fn non_retryable_failure_is_terminal() {
        let q = queue().await;
        let id = q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, None).await.unwrap();
        q.claim("worker-1").await.unwrap();
        q.fail(id, "bad key", false).await.unwrap();
        let job = q.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn exhausted_attempts_becomes_failed_even_if_retryable() {
        let q = queue().await;
        let id = q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, Some(1)).await.unwrap();
        q.claim("worker-1").await.unwrap();
        q.fail(id, "still broken", true).await.unwrap();
        let job = q.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn cancel_refuses_while_processing() {
        let q = queue().await;
        let id = q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, None).await.unwrap();
        q.claim("worker-1").await.unwrap();
        assert!(q.cancel(id).await.is_err());
    }

    #[tokio::test]
    async fn retry_resets_a_failed_job() {
        let q = queue().await;
        let id = q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, None).await.unwrap();
        q.claim("worker-1").await.unwrap();
        q.fail(id, "bad key", false).await.unwrap();
        q.retry(id).await.unwrap();
        let job = q.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn complete_and_fail_publish_queue_status_when_a_notifier_is_attached() {
        use curation_notify::NotificationBus;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let store = NodeStore::connect("sqlite::memory:").await.unwrap();
        let notifier = Arc::new(NotificationBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        notifier.subscribe(Some(curation_notify::EventKind::QueueStatus), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let q = Queue::new(store.pool().clone(), QueueConfig::default()).with_notifier(notifier);

        let id = q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, Some(5)).await.unwrap();
        q.claim("worker-1").await.unwrap();
        q.fail(id, "transient", true).await.unwrap();
        q.complete(id).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn get_stats_counts_by_status() {
        let q = queue().await;
        q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, None).await.unwrap();
        q.enqueue(Uuid::new_v4(), JobPhase::Phase2, 0, None).await.unwrap();
        let stats = q.get_stats().await.unwrap();
        assert_eq!(stats.pending, 2);
    }
}
