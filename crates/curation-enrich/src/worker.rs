//! The Phase-2 worker pool (§4.7): each worker loops `claim -> enrich ->
//! complete/fail`, independent of the others. Concurrency is bounded by how
//! many `EnrichmentWorker`s the caller spawns, not by a shared semaphore —
//! each worker is a single `tokio::spawn`ed task polling the same queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use curation_ai::{complete_structured, LlmProvider};
use curation_core::{CurationError, CurationResult, ErrorKind, Job, Node, NodeDelta};
use curation_hierarchy::HierarchyEngine;
use curation_notify::{EnrichmentCompleteEvent, NotificationBus, NotificationEvent};
use curation_queue::Queue;
use curation_store::NodeStore;

use crate::normalize::normalize_metadata_codes;
use crate::prompt::{system_prompt, user_prompt};
use crate::reclassify::regenerate_if_changed;
use crate::schema::EnrichmentOutput;

/// An enrichment pass produced an output too threadbare to be worth
/// keeping — every descriptive field empty and no metadata codes at all.
/// Schema-shaped but substantively empty; worth one retry before giving up.
fn output_is_degenerate(output: &EnrichmentOutput) -> bool {
    output.title.is_none()
        && output.company.is_none()
        && output.phrase_description.is_none()
        && output.short_description.is_none()
        && output.ai_summary.is_none()
        && output.key_concepts.is_empty()
        && output.logo_url.is_none()
        && output.metadata_codes.is_empty()
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

pub struct EnrichmentWorker {
    worker_id: String,
    store: Arc<NodeStore>,
    queue: Queue,
    hierarchy: Arc<HierarchyEngine>,
    provider: Arc<dyn LlmProvider>,
    notifier: Arc<NotificationBus>,
}

impl EnrichmentWorker {
    pub fn new(
        worker_id: impl Into<String>,
        store: Arc<NodeStore>,
        queue: Queue,
        hierarchy: Arc<HierarchyEngine>,
        provider: Arc<dyn LlmProvider>,
        notifier: Arc<NotificationBus>,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            store,
            queue,
            hierarchy,
            provider,
            notifier,
        }
    }

    /// Runs forever, polling `queue` for `phase2` jobs at `poll_interval`
    /// whenever a claim comes back empty. Intended to be `tokio::spawn`ed
    /// once per pool slot at process startup.
    pub async fn run(&self, poll_interval: Duration) {
        loop {
            match self.run_once().await {
                Ok(true) => continue,
                Ok(false) => tokio::time::sleep(poll_interval).await,
                Err(error) => {
                    warn!(worker = %self.worker_id, %error, "enrichment worker loop error");
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }

    /// Claims and processes at most one job. Returns `Ok(true)` if a job
    /// was claimed (whether it succeeded or failed), `Ok(false)` if the
    /// queue had nothing eligible.
    pub async fn run_once(&self) -> CurationResult<bool> {
        let Some(job) = self.queue.claim(&self.worker_id).await? else {
            return Ok(false);
        };

        match self.enrich(&job).await {
            Ok(description) => {
                self.queue.complete(job.id).await?;
                info!(node_id = %job.node_id, job_id = job.id, "enrichment complete");
                self.notifier.publish(NotificationEvent::EnrichmentComplete(
                    EnrichmentCompleteEvent {
                        node_id: job.node_id,
                        success: true,
                        hierarchy_updates: description.map(|d| serde_json::json!({"description": d})),
                        error_message: None,
                        timestamp: Utc::now(),
                    },
                ));
            }
            Err(error) => {
                let retryable = retry_decision(&error, &job);
                warn!(node_id = %job.node_id, job_id = job.id, %error, retryable, "enrichment failed");
                self.queue.fail(job.id, &error.message, retryable).await?;
                if !retryable {
                    self.notifier.publish(NotificationEvent::EnrichmentComplete(
                        EnrichmentCompleteEvent {
                            node_id: job.node_id,
                            success: false,
                            hierarchy_updates: None,
                            error_message: Some(error.message.clone()),
                            timestamp: Utc::now(),
                        },
                    ));
                }
            }
        }

        Ok(true)
    }

    /// The body of one enrichment pass. Returns a description of any
    /// hierarchy restructure triggered by a newly-learned company, if one
    /// happened.
    async fn enrich(&self, job: &Job) -> CurationResult<Option<String>> {
        let node = self
            .store
            .get(job.node_id)
            .await?
            .ok_or_else(|| CurationError::new(ErrorKind::NodeNotFound, "node not found"))?;

        let output = self.call_llm(&node).await?;
        if output_is_degenerate(&output) {
            return Err(CurationError::new(
                ErrorKind::SchemaValidationFailed,
                "enrichment output carried no usable fields",
            ));
        }

        let metadata_codes = normalize_metadata_codes(&output.metadata_codes);
        let key_concepts = (!output.key_concepts.is_empty()).then_some(output.key_concepts);
        let before_company = node.company.clone();

        let delta = NodeDelta {
            title: non_empty(output.title),
            company: non_empty(output.company),
            ai_summary: non_empty(output.ai_summary),
            phrase_description: non_empty(output.phrase_description),
            short_description: non_empty(output.short_description),
            key_concepts,
            logo_url: non_empty(output.logo_url),
            extracted_fields: None,
        };

        let updated = self.store.update(job.node_id, delta).await?;
        if !metadata_codes.is_empty() {
            self.store.add_metadata(job.node_id, &metadata_codes).await?;
        }

        regenerate_if_changed(&self.store, &self.hierarchy, job.node_id, &before_company, &updated)
            .await
    }

    async fn call_llm(&self, node: &Node) -> CurationResult<EnrichmentOutput> {
        let system = system_prompt();
        let user = user_prompt(node);
        let (output, _usage) =
            complete_structured::<EnrichmentOutput>(self.provider.as_ref(), &system, &user).await?;
        Ok(output)
    }
}

/// LLM error mapping (§4.7): rate-limit and timeout retry through the
/// queue's normal backoff; an invalid API key never will. A schema
/// validation failure gets exactly one retry — `job.attempts` is already
/// incremented by `claim`, so `1` means this was the first attempt.
fn retry_decision(error: &CurationError, job: &Job) -> bool {
    match error.kind {
        ErrorKind::SchemaValidationFailed => job.attempts <= 1,
        other => other.retryable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use curation_ai::TokenUsage;
    use curation_core::{JobPhase, MetadataType, NodeDraft, NodeId};
    use curation_store::NewNodeCodes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        response: String,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn complete(&self, _system: &str, _user: &str) -> CurationResult<String> {
            Ok(self.response.clone())
        }

        async fn complete_json_schema(
            &self,
            _system: &str,
            _user: &str,
            _schema_name: &str,
            _schema: serde_json::Value,
        ) -> CurationResult<(String, TokenUsage)> {
            Ok((self.response.clone(), TokenUsage::default()))
        }
    }

    struct CountingFailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for CountingFailingProvider {
        async fn complete(&self, _system: &str, _user: &str) -> CurationResult<String> {
            Err(CurationError::new(ErrorKind::LlmTimeout, "timed out"))
        }

        async fn complete_json_schema(
            &self,
            _system: &str,
            _user: &str,
            _schema_name: &str,
            _schema: serde_json::Value,
        ) -> CurationResult<(String, TokenUsage)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CurationError::new(ErrorKind::LlmRateLimited, "rate limited"))
        }
    }

    async fn store_with_node() -> (Arc<NodeStore>, NodeId) {
        let store = Arc::new(NodeStore::connect("sqlite::memory:").await.unwrap());
        let draft = NodeDraft {
            title: "Untitled".to_string(),
            source_url: "https://example.com/a".to_string(),
            source_domain: "example.com".to_string(),
            company: None,
            extracted_fields: serde_json::json!({"main_content": "rust async runtime guide"}),
            classification: curation_core::Classification {
                segment: 'T',
                category: "DEV".to_string(),
                content_type: 'A',
                organization: "UNKN".to_string(),
                confidence: 0.9,
                reasoning: None,
                from_cache: false,
                fallback: false,
            },
            metadata_tags: Vec::new(),
        };
        let node = store
            .create(
                &draft,
                NewNodeCodes {
                    function_code: "T.DEV.A.1".to_string(),
                    organization_code: "UNKN.DEV.A.1".to_string(),
                },
                Vec::new(),
                Vec::new(),
                None,
            )
            .await
            .unwrap();
        (store, node.id)
    }

    fn worker(
        store: Arc<NodeStore>,
        provider: Arc<dyn LlmProvider>,
    ) -> (EnrichmentWorker, Queue) {
        let queue = Queue::new(store.pool().clone(), curation_queue::QueueConfig::default());
        let hierarchy = Arc::new(HierarchyEngine::new(store.clone()));
        let notifier = Arc::new(NotificationBus::new());
        (
            EnrichmentWorker::new("worker-1", store, queue.clone(), hierarchy, provider, notifier),
            queue,
        )
    }

    #[tokio::test]
    async fn successful_enrichment_completes_job_and_updates_node() {
        let (store, node_id) = store_with_node().await;
        let response = serde_json::json!({
            "title": "Async Rust, properly explained",
            "company": "Tokio",
            "phraseDescription": "an async runtime guide",
            "shortDescription": "A guide to async Rust.",
            "aiSummary": "Covers futures, tasks, and the reactor.",
            "keyConcepts": ["async", "futures", "tokio"],
            "logoUrl": null,
            "metadataCodes": [{"metadataType": "tec", "code": "async", "confidence": 0.9}]
        })
        .to_string();
        let (worker, queue) = worker(store.clone(), Arc::new(StubProvider { response }));

        let job_id = queue
            .enqueue(node_id, JobPhase::Phase2, 0, None)
            .await
            .unwrap();
        let claimed = worker.run_once().await.unwrap();
        assert!(claimed);

        let job = queue.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, curation_core::JobStatus::Complete);

        let node = store.get(node_id).await.unwrap().unwrap();
        assert_eq!(node.title, "Async Rust, properly explained");
        assert_eq!(node.company.as_deref(), Some("Tokio"));
        assert!(node.key_concepts.contains(&"async".to_string()));

        let entry = store
            .get_registry_entry(MetadataType::Tec, "ASYNC")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.usage_count, 1);
    }

    #[tokio::test]
    async fn degenerate_output_is_retried_once_then_terminal() {
        let (store, node_id) = store_with_node().await;
        let response = serde_json::json!({
            "title": null, "company": null, "phraseDescription": null,
            "shortDescription": null, "aiSummary": null, "keyConcepts": [],
            "logoUrl": null, "metadataCodes": []
        })
        .to_string();
        let (worker, queue) = worker(store.clone(), Arc::new(StubProvider { response }));

        let job_id = queue
            .enqueue(node_id, JobPhase::Phase2, 0, None)
            .await
            .unwrap();
        worker.run_once().await.unwrap();
        let job = queue.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, curation_core::JobStatus::Pending);
        assert_eq!(job.attempts, 1);

        worker.run_once().await.unwrap();
        let job = queue.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, curation_core::JobStatus::Failed);
    }

    #[tokio::test]
    async fn rate_limited_llm_call_retries() {
        let (store, node_id) = store_with_node().await;
        let provider = Arc::new(CountingFailingProvider {
            calls: AtomicUsize::new(0),
        });
        let (worker, queue) = worker(store.clone(), provider.clone());

        let job_id = queue
            .enqueue(node_id, JobPhase::Phase2, 0, None)
            .await
            .unwrap();
        worker.run_once().await.unwrap();
        let job = queue.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, curation_core::JobStatus::Pending);
        assert_eq!(job.attempts, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_queue_returns_false() {
        let (store, _node_id) = store_with_node().await;
        let (worker, _queue) = worker(store, Arc::new(StubProvider { response: "{}".to_string() }));
        assert!(!worker.run_once().await.unwrap());
    }
}
