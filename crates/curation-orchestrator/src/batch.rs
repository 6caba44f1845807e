//! Batch import (§[SUPPLEMENT] batch import): a bounded list of URLs run
//! independently through the orchestrator. No item's failure rolls back
//! another's success — the only shared state is the summary row each
//! item updates as it finishes.

use std::sync::Arc;

use curation_core::{BatchDetail, BatchItemStatus, CurationError, CurationResult, ErrorKind};
use curation_store::NodeStore;
use uuid::Uuid;

use crate::orchestrator::ImportOrchestrator;
use crate::types::ImportOptions;

pub const MAX_BATCH_SIZE: usize = 50;

/// Persists the batch row and spawns the background run; returns as soon
/// as the row exists so the caller can poll `get_batch` immediately.
pub async fn start_batch(
    orchestrator: Arc<ImportOrchestrator>,
    urls: Vec<String>,
) -> CurationResult<Uuid> {
    if urls.is_empty() || urls.len() > MAX_BATCH_SIZE {
        return Err(CurationError::new(
            ErrorKind::InvalidInput,
            format!("batch import accepts 1..={MAX_BATCH_SIZE} URLs, got {}", urls.len()),
        ));
    }

    let batch_id = Uuid::new_v4();
    let store = orchestrator.store().clone();
    store.create_batch(batch_id, &urls).await?;

    tokio::spawn(run_batch(orchestrator, store, batch_id, urls));
    Ok(batch_id)
}

async fn run_batch(orchestrator: Arc<ImportOrchestrator>, store: Arc<NodeStore>, batch_id: Uuid, urls: Vec<String>) {
    for (order, url) in urls.iter().enumerate() {
        if !item_still_queued(&store, batch_id, order as i32).await {
            continue;
        }

        match orchestrator.import(url, ImportOptions::default()).await {
            Ok(result) => {
                if let Err(error) = store
                    .update_batch_item(batch_id, order as i32, Some(result.node_id), None, BatchItemStatus::Succeeded)
                    .await
                {
                    tracing::warn!(%batch_id, order, %error, "failed to record batch item success");
                }
            }
            Err(error) => {
                tracing::warn!(%batch_id, order, url, %error, "batch item import failed");
                if let Err(store_error) = store
                    .update_batch_item(batch_id, order as i32, None, Some(error.message), BatchItemStatus::Failed)
                    .await
                {
                    tracing::warn!(%batch_id, order, error = %store_error, "failed to record batch item failure");
                }
            }
        }
    }
}

async fn item_still_queued(store: &NodeStore, batch_id: Uuid, order: i32) -> bool {
    match store.get_batch(batch_id).await {
        Ok(Some(detail)) => detail
            .items
            .get(order as usize)
            .is_some_and(|item| item.status == BatchItemStatus::Queued),
        _ => false,
    }
}

/// Marks every item still queued as cancelled; items already in flight or
/// finished run to completion or keep their recorded outcome.
pub async fn cancel_batch(store: &NodeStore, batch_id: Uuid) -> CurationResult<u64> {
    store.cancel_not_started_items(batch_id).await
}

pub async fn get_batch(store: &NodeStore, batch_id: Uuid) -> CurationResult<Option<BatchDetail>> {
    store.get_batch(batch_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_oversized_batch() {
        let store = Arc::new(NodeStore::connect("sqlite::memory:").await.unwrap());
        let orchestrator = Arc::new(test_orchestrator(store).await);
        let urls: Vec<String> = (0..51).map(|i| format!("https://example.com/{i}")).collect();
        let result = start_batch(orchestrator, urls).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rejects_empty_batch() {
        let store = Arc::new(NodeStore::connect("sqlite::memory:").await.unwrap());
        let orchestrator = Arc::new(test_orchestrator(store).await);
        let result = start_batch(orchestrator, Vec::new()).await;
        assert!(result.is_err());
    }

    async fn test_orchestrator(store: Arc<NodeStore>) -> ImportOrchestrator {
        use async_trait::async_trait;
        use curation_ai::{LlmProvider, TokenUsage};
        use curation_classify::Classifier;
        use curation_extract::{ExtractorRegistry, Fetcher};
        use curation_hierarchy::HierarchyEngine;
        use curation_queue::{Queue, QueueConfig};
        use std::time::Duration;

        struct StubProvider;

        #[async_trait]
        impl LlmProvider for StubProvider {
            async fn complete(&self, _system: &str, _user: &str) -> CurationResult<String> {
                Ok("{}".to_string())
            }

            async fn complete_json_schema(
                &self,
                _system: &str,
                _user: &str,
                _schema_name: &str,
                _schema: serde_json::Value,
            ) -> CurationResult<(String, TokenUsage)> {
                Ok(("{}".to_string(), TokenUsage::default()))
            }
        }

        ImportOrchestrator::new(
            store.clone(),
            Arc::new(HierarchyEngine::new(store.clone())),
            Arc::new(Classifier::new(Arc::new(StubProvider), Duration::from_secs(60))),
            Arc::new(ExtractorRegistry::with_defaults()),
            Arc::new(Fetcher::new(5, 1_000_000, 2, 4)),
            Queue::new(store.pool().clone(), QueueConfig::default()),
            curation_core::UrlValidator::new(),
            None,
            None,
        )
    }
}
