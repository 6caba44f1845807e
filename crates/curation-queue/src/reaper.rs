//! Background sweep that recovers orphaned `processing` rows (§4.6):
//! a worker that claimed a job and then crashed or hung leaves the row
//! stuck at `processing` forever unless something else notices. The
//! reaper periodically finds rows whose `claimed_at` is older than the
//! visibility timeout and requeues them as retryable failures, which
//! routes them back through the normal backoff/attempts machinery.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::Queue;

pub struct Reaper {
    queue: Queue,
    sweep_interval: Duration,
}

impl Reaper {
    pub fn new(queue: Queue, sweep_interval: Duration) -> Self {
        Self {
            queue,
            sweep_interval,
        }
    }

    /// Runs forever. Intended to be `tokio::spawn`ed once at process
    /// startup alongside the Phase 2 worker pool.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(error) = self.sweep_once().await {
                warn!(%error, "reaper sweep failed");
            }
        }
    }

    /// One sweep, exposed separately so callers/tests can drive it without
    /// waiting on the interval.
    pub async fn sweep_once(&self) -> curation_core::CurationResult<usize> {
        let visibility_timeout =
            chrono::Duration::seconds(self.queue.config().visibility_timeout_secs);
        let cutoff = Utc::now() - visibility_timeout;
        let stale = self.queue.find_stale_processing(cutoff).await?;

        for job in &stale {
            self.queue
                .fail(
                    job.id,
                    "reaped: exceeded visibility timeout while processing",
                    true,
                )
                .await?;
        }

        if !stale.is_empty() {
            info!(count = stale.len(), "reaper requeued stale processing jobs");
        }

        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueueConfig;
    use curation_core::JobPhase;
    use curation_store::NodeStore;
    use uuid::Uuid;

    async fn queue_with_config(config: QueueConfig) -> Queue {
        let store = NodeStore::connect("sqlite::memory:").await.unwrap();
        Queue::new(store.pool().clone(), config)
    }

    #[tokio::test]
    async fn sweep_requeues_jobs_claimed_past_the_visibility_timeout() {
        let config = QueueConfig {
            visibility_timeout_secs: -1, // anything claimed "in the past" is already stale
            ..QueueConfig::default()
        };
        let queue = queue_with_config(config).await;
        let node_id = Uuid::new_v4();
        let job_id = queue
            .enqueue(node_id, JobPhase::Phase2, 0, None)
            .await
            .unwrap();
        queue.claim("worker-1").await.unwrap();

        let reaper = Reaper::new(queue.clone(), Duration::from_secs(60));
        let swept = reaper.sweep_once().await.unwrap();
        assert_eq!(swept, 1);

        let job = queue.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, curation_core::JobStatus::Pending);
    }

    #[tokio::test]
    async fn sweep_leaves_fresh_processing_jobs_alone() {
        let queue = queue_with_config(QueueConfig::default()).await;
        let node_id = Uuid::new_v4();
        let job_id = queue
            .enqueue(node_id, JobPhase::Phase2, 0, None)
            .await
            .unwrap();
        queue.claim("worker-1").await.unwrap();

        let reaper = Reaper::new(queue.clone(), Duration::from_secs(60));
        let swept = reaper.sweep_once().await.unwrap();
        assert_eq!(swept, 0);

        let job = queue.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, curation_core::JobStatus::Processing);
    }
}
