//! The Import Orchestrator (C7): validate -> duplicate check -> fetch ->
//! classify -> plan hierarchy codes -> commit -> queue Phase 2 (§4.8).
//! Classification and Phase-2 queuing are the only steps allowed to be
//! partial failures; everything through "commit" is one all-or-nothing
//! transaction owned by `NodeStore::create`.

use std::sync::Arc;

use chrono::Utc;
use curation_core::{
    Classification, CurationResult, JobPhase, Node, NodeDraft, UrlValidator,
};
use curation_classify::Classifier;
use curation_extract::{ExtractionContext, ExtractorRegistry, Fetcher};
use curation_hierarchy::{HierarchyEngine, NewNodeAttributes};
use curation_queue::Queue;
use curation_store::{NewNodeCodes, NodeStore};

use crate::types::{HierarchyCodes, ImportOptions, ImportResult};

const DEFAULT_PHASE2_PRIORITY: i32 = 0;

pub struct ImportOrchestrator {
    store: Arc<NodeStore>,
    hierarchy: Arc<HierarchyEngine>,
    classifier: Arc<Classifier>,
    registry: Arc<ExtractorRegistry>,
    fetcher: Arc<Fetcher>,
    queue: Queue,
    validator: UrlValidator,
    firecrawl_api_key: Option<String>,
    apify_api_key: Option<String>,
}

impl ImportOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<NodeStore>,
        hierarchy: Arc<HierarchyEngine>,
        classifier: Arc<Classifier>,
        registry: Arc<ExtractorRegistry>,
        fetcher: Arc<Fetcher>,
        queue: Queue,
        validator: UrlValidator,
        firecrawl_api_key: Option<String>,
        apify_api_key: Option<String>,
    ) -> Self {
        Self {
            store,
            hierarchy,
            classifier,
            registry,
            fetcher,
            queue,
            validator,
            firecrawl_api_key,
            apify_api_key,
        }
    }

    pub fn store(&self) -> &Arc<NodeStore> {
        &self.store
    }

    /// Run one URL through the full pipeline. A URL already imported
    /// short-circuits to the existing node (invariant: duplicate
    /// suppression by canonical URL) unless `options.force_refresh` is set,
    /// in which case the pipeline re-fetches and re-classifies (§4.8 step 2).
    pub async fn import(&self, raw_url: &str, options: ImportOptions) -> CurationResult<ImportResult> {
        let canonical = self.validator.validate(raw_url)?;
        let existing = self.store.get_by_source_url(&canonical).await?;

        if !options.force_refresh {
            if let Some(existing) = existing {
                return Ok(cached_result(&existing));
            }
        }

        let fetched = self.fetcher.fetch(&canonical).await?;
        let domain = domain_of(&canonical);

        let ctx = ExtractionContext {
            canonical_url: canonical.clone(),
            firecrawl_api_key: self.firecrawl_api_key.clone(),
            apify_api_key: self.apify_api_key.clone(),
        };
        let extracted = self.registry.extract(&ctx, &fetched).await?;

        let classification = self
            .classifier
            .classify(&canonical, &domain, &extracted, options.force_refresh)
            .await;

        let attrs = NewNodeAttributes {
            company: None,
            source_domain: domain.clone(),
            earliest_metadata_tag: None,
            created_at: existing.as_ref().map(|n| n.created_at).unwrap_or_else(Utc::now),
        };
        let plan = match &existing {
            Some(node) => {
                self.hierarchy
                    .plan_reclassified_node(node.id, &classification, &attrs)
                    .await?
            }
            None => self.hierarchy.plan_new_node(&classification, &attrs).await?,
        };

        let metadata = serde_json::to_value(&extracted).unwrap_or(serde_json::Value::Null);
        let draft = NodeDraft {
            title: extracted.title.clone(),
            source_url: canonical,
            source_domain: domain,
            company: None,
            extracted_fields: metadata.clone(),
            classification: classification.clone(),
            metadata_tags: Vec::new(),
        };
        let codes = NewNodeCodes {
            function_code: plan.function.new_code.clone(),
            organization_code: plan.organization.new_code.clone(),
        };
        let mutations = plan.all_mutations();

        let node = match &existing {
            Some(existing) => {
                self.store
                    .reclassify(
                        existing.id,
                        &draft,
                        codes,
                        mutations,
                        Vec::new(),
                        Some("forced re-import".to_string()),
                    )
                    .await?
            }
            None => {
                self.store
                    .create(&draft, codes, mutations, Vec::new(), Some("fresh import".to_string()))
                    .await?
            }
        };
        self.hierarchy.invalidate_after_commit(&plan);

        let (phase2_queued, phase2_job_id) = if options.create_queue_job {
            let job_id = self
                .queue
                .enqueue(node.id, JobPhase::Phase2, DEFAULT_PHASE2_PRIORITY, None)
                .await?;
            (true, Some(job_id))
        } else {
            (false, None)
        };

        Ok(ImportResult {
            success: true,
            node_id: node.id,
            cached: false,
            hierarchy_codes: HierarchyCodes {
                function: node.function_hierarchy_code,
                organization: node.organization_hierarchy_code,
            },
            classification,
            metadata,
            phase2_queued,
            phase2_job_id,
        })
    }
}

fn domain_of(canonical_url: &str) -> String {
    url::Url::parse(canonical_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Reconstructs the `Classification` a node was created with from its
/// persisted hierarchy/taxonomy columns, for the cached-duplicate path.
fn classification_from_node(node: &Node) -> Classification {
    Classification {
        segment: node.segment_code.chars().next().unwrap_or('T'),
        category: node.category_code.clone(),
        content_type: node.content_type_code.chars().next().unwrap_or('A'),
        organization: node.organization_code.clone(),
        confidence: 1.0,
        reasoning: None,
        from_cache: true,
        fallback: false,
    }
}

fn cached_result(node: &Node) -> ImportResult {
    ImportResult {
        success: true,
        node_id: node.id,
        cached: true,
        classification: classification_from_node(node),
        hierarchy_codes: HierarchyCodes {
            function: node.function_hierarchy_code.clone(),
            organization: node.organization_hierarchy_code.clone(),
        },
        metadata: node.extracted_fields.clone(),
        phase2_queued: false,
        phase2_job_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use curation_ai::{LlmProvider, TokenUsage};
    use std::time::Duration;

    struct StubProvider;

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn complete(&self, _system: &str, _user: &str) -> CurationResult<String> {
            Ok(serde_json::json!({
                "segment": "T",
                "category": "DEV",
                "contentType": "A",
                "organization": "UNKN",
                "confidence": 0.8,
                "reasoning": null
            })
            .to_string())
        }

        async fn complete_json_schema(
            &self,
            system: &str,
            user: &str,
            _schema_name: &str,
            _schema: serde_json::Value,
        ) -> CurationResult<(String, TokenUsage)> {
            let body = self.complete(system, user).await?;
            Ok((body, TokenUsage::default()))
        }
    }

    async fn orchestrator() -> (ImportOrchestrator, Arc<NodeStore>) {
        let store = Arc::new(NodeStore::connect("sqlite::memory:").await.unwrap());
        let hierarchy = Arc::new(HierarchyEngine::new(store.clone()));
        let classifier = Arc::new(Classifier::new(Arc::new(StubProvider), Duration::from_secs(60)));
        let registry = Arc::new(ExtractorRegistry::with_defaults());
        let fetcher = Arc::new(Fetcher::new(5, 1_000_000, 2, 4));
        let queue = Queue::new(store.pool().clone(), curation_queue::QueueConfig::default());
        let validator = UrlValidator::new().without_https_upgrade();
        let orchestrator = ImportOrchestrator::new(
            store.clone(),
            hierarchy,
            classifier,
            registry,
            fetcher,
            queue,
            validator,
            None,
            None,
        );
        (orchestrator, store)
    }

    #[tokio::test]
    async fn rejects_ssrf_targets_before_any_fetch() {
        let (orchestrator, _store) = orchestrator().await;
        let result = orchestrator
            .import("http://169.254.169.254/latest/meta-data", ImportOptions::default())
            .await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind,
            curation_core::ErrorKind::SsrfBlocked
        );
    }

    #[tokio::test]
    async fn duplicate_url_short_circuits_to_cached_node() {
        let (orchestrator, store) = orchestrator().await;

        let draft = curation_core::NodeDraft {
            title: "Existing".to_string(),
            source_url: "https://example.com/already-here".to_string(),
            source_domain: "example.com".to_string(),
            company: None,
            extracted_fields: serde_json::json!({}),
            classification: Classification {
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
        let existing = store
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

        let result = orchestrator
            .import("https://example.com/already-here", ImportOptions::default())
            .await
            .unwrap();
        assert!(result.cached);
        assert_eq!(result.node_id, existing.id);
        assert!(!result.phase2_queued);
    }
}
