//! The Node Store (C6): transactional persistence over an embedded SQL
//! engine. Desktop/small-server scope means SQLite rather than the
//! teacher's Postgres — the one dependency re-pointing noted in
//! `DESIGN.md` — but every query still goes through `sqlx`, the teacher's
//! SQL layer throughout its own store crates.

mod audit;
mod batch;
mod error;
mod fts;
mod metadata;
mod model;
mod nodes;
mod pagination;
mod search;

pub use model::CodeMutation;
pub use nodes::{ListFilter, NewNodeCodes};
pub use pagination::{PaginatedResult, Pagination};
pub use search::{FacetCounts, SearchFilter, SearchResult};

use curation_core::CurationResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Handle to the embedded relational store. Cheap to clone — wraps a
/// connection pool.
#[derive(Clone)]
pub struct NodeStore {
    pool: SqlitePool,
}

impl NodeStore {
    /// Connect and apply all pending migrations. `database_url` is a
    /// `sqlite://` URL; `sqlite::memory:` is used by tests.
    pub async fn connect(database_url: &str) -> CurationResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                curation_core::CurationError::new(
                    curation_core::ErrorKind::ConfigurationError,
                    format!("invalid database URL: {e}"),
                )
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(error::from_sqlx)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Cheapest possible liveness probe, for `/health/full`.
    pub async fn ping(&self) -> CurationResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(error::from_sqlx)?;
        Ok(())
    }

    async fn migrate(&self) -> CurationResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                curation_core::CurationError::new(
                    curation_core::ErrorKind::DatabaseTransactionError,
                    format!("migration failed: {e}"),
                )
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_core::{Classification, MetadataCode, MetadataType, NodeDelta, NodeDraft};

    async fn test_store() -> NodeStore {
        NodeStore::connect("sqlite::memory:").await.unwrap()
    }

    fn draft(url: &str) -> NodeDraft {
        NodeDraft {
            title: "Example Article".to_string(),
            source_url: url.to_string(),
            source_domain: "example.com".to_string(),
            company: Some("Example Inc".to_string()),
            extracted_fields: serde_json::json!({"wordCount": 400}),
            classification: Classification {
                segment: 'T',
                category: "DEV".to_string(),
                content_type: 'A',
                organization: "UNKN".to_string(),
                confidence: 0.8,
                reasoning: None,
                from_cache: false,
                fallback: false,
            },
            metadata_tags: vec!["rust".to_string()],
        }
    }

    #[tokio::test]
    async fn creates_and_reads_back_a_node() {
        let store = test_store().await;
        let node = store
            .create(
                &draft("https://example.com/article"),
                NewNodeCodes {
                    function_code: "T.DEV.A.1".to_string(),
                    organization_code: "UNKN.DEV.A.1".to_string(),
                },
                Vec::new(),
                Vec::new(),
                Some("fresh import".to_string()),
            )
            .await
            .unwrap();

        let fetched = store.get(node.id).await.unwrap().unwrap();
        assert_eq!(fetched.function_hierarchy_code, "T.DEV.A.1");
        assert_eq!(fetched.title, "Example Article");

        let audit = store.get_audit_log(node.id).await.unwrap();
        assert_eq!(audit.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_source_url_is_rejected_at_the_row_level() {
        let store = test_store().await;
        let codes = || NewNodeCodes {
            function_code: "T.DEV.A.1".to_string(),
            organization_code: "UNKN.DEV.A.1".to_string(),
        };
        store
            .create(&draft("https://example.com/dup"), codes(), Vec::new(), Vec::new(), None)
            .await
            .unwrap();

        let second = store
            .create(
                &draft("https://example.com/dup"),
                NewNodeCodes {
                    function_code: "T.DEV.A.2".to_string(),
                    organization_code: "UNKN.DEV.A.2".to_string(),
                },
                Vec::new(),
                Vec::new(),
                None,
            )
            .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn applies_restructure_mutations_atomically() {
        let store = test_store().await;
        let existing = store
            .create(
                &draft("https://anthropic.com/post"),
                NewNodeCodes {
                    function_code: "T.DEV.A.1".to_string(),
                    organization_code: "ANTH.DEV.A.1".to_string(),
                },
                Vec::new(),
                Vec::new(),
                None,
            )
            .await
            .unwrap();

        let new_node = store
            .create(
                &draft("https://openai.com/post"),
                NewNodeCodes {
                    function_code: "T.DEV.A.2.1".to_string(),
                    organization_code: "OPAI.DEV.A.1".to_string(),
                },
                vec![CodeMutation {
                    node_id: existing.id,
                    old_code: "T.DEV.A.1".to_string(),
                    new_code: "T.DEV.A.1.1".to_string(),
                    view: curation_core::HierarchyView::Function,
                }],
                Vec::new(),
                Some("conflict split by company".to_string()),
            )
            .await
            .unwrap();

        let existing_after = store.get(existing.id).await.unwrap().unwrap();
        assert_eq!(existing_after.function_hierarchy_code, "T.DEV.A.1.1");
        assert_eq!(new_node.function_hierarchy_code, "T.DEV.A.2.1");

        let audit = store.get_audit_log(existing.id).await.unwrap();
        assert!(audit.iter().any(|a| a.change_type == curation_core::ChangeType::Restructured));
    }

    #[tokio::test]
    async fn soft_delete_removes_from_listings_and_fts() {
        let store = test_store().await;
        let node = store
            .create(
                &draft("https://example.com/to-delete"),
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

        store.soft_delete(node.id).await.unwrap();
        assert!(store.get(node.id).await.unwrap().is_none());

        let result = store
            .keyword_search(
                "Example",
                &search::SearchFilter::default(),
                1,
                20,
            )
            .await
            .unwrap();
        assert!(result.data.iter().all(|n| n.id != node.id));
    }

    #[tokio::test]
    async fn metadata_usage_counts_track_live_links() {
        let store = test_store().await;
        let node = store
            .create(
                &draft("https://example.com/meta"),
                NewNodeCodes {
                    function_code: "T.DEV.A.1".to_string(),
                    organization_code: "UNKN.DEV.A.1".to_string(),
                },
                Vec::new(),
                vec![MetadataCode {
                    metadata_type: MetadataType::Tec,
                    code: "rust".to_string(),
                    confidence: 0.9,
                    source: "phase1".to_string(),
                }],
                None,
            )
            .await
            .unwrap();

        let entry = store
            .get_registry_entry(MetadataType::Tec, "RUST")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.usage_count, 1);

        store.soft_delete(node.id).await.unwrap();
        // usage_count is not auto-decremented by soft delete per the source's
        // own behavior (registry entries persist across node lifecycle);
        // decrementing happens only via set_metadata/add_metadata churn.
    }

    #[tokio::test]
    async fn pagination_reports_has_more_correctly() {
        let store = test_store().await;
        for i in 0..3 {
            store
                .create(
                    &draft(&format!("https://example.com/p{i}")),
                    NewNodeCodes {
                        function_code: format!("T.DEV.A.{}", i + 1),
                        organization_code: format!("UNKN.DEV.A.{}", i + 1),
                    },
                    Vec::new(),
                    Vec::new(),
                    None,
                )
                .await
                .unwrap();
        }

        let page1 = store
            .list_paginated(&ListFilter::default(), 1, 2)
            .await
            .unwrap();
        assert_eq!(page1.data.len(), 2);
        assert!(page1.pagination.has_more);

        let page2 = store
            .list_paginated(&ListFilter::default(), 2, 2)
            .await
            .unwrap();
        assert_eq!(page2.data.len(), 1);
        assert!(!page2.pagination.has_more);
    }

    #[tokio::test]
    async fn reclassify_updates_codes_in_place_without_violating_uniqueness() {
        let store = test_store().await;
        let node = store
            .create(
                &draft("https://example.com/reimport"),
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

        let mut refreshed_draft = draft("https://example.com/reimport");
        refreshed_draft.classification.content_type = 'R';
        refreshed_draft.classification.organization = "GHUB".to_string();

        let reclassified = store
            .reclassify(
                node.id,
                &refreshed_draft,
                NewNodeCodes {
                    function_code: "T.DEV.R.1".to_string(),
                    organization_code: "GHUB.DEV.R.1".to_string(),
                },
                Vec::new(),
                Vec::new(),
                Some("forced re-import".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(reclassified.id, node.id);
        assert_eq!(reclassified.function_hierarchy_code, "T.DEV.R.1");
        assert_eq!(reclassified.organization_hierarchy_code, "GHUB.DEV.R.1");
        assert_eq!(reclassified.content_type_code, "R");

        // the row was updated in place, not duplicated
        assert!(store.get_by_source_url("https://example.com/reimport").await.unwrap().is_some());
        let all = store.list_all(&ListFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);

        let audit = store.get_audit_log(node.id).await.unwrap();
        assert!(audit.iter().any(|a| a.change_type == curation_core::ChangeType::Updated));
    }

    #[tokio::test]
    async fn update_regenerates_descriptor_and_fts() {
        let store = test_store().await;
        let node = store
            .create(
                &draft("https://example.com/upd"),
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

        let updated = store
            .update(
                node.id,
                NodeDelta {
                    ai_summary: Some("A deep dive into widgets.".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.descriptor.contains("deep dive"));
    }
}
