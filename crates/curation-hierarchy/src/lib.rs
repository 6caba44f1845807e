//! The Hierarchy Engine (C5) and its read-through cache (C11).
//!
//! `differentiate` holds the pure sibling-splitting ladder, `plan` the pure
//! restructure planner built on top of it, and `cache` the memoized reads.
//! `HierarchyEngine` ties the three to a live `NodeStore`: it gathers the
//! sibling set a plan needs, and invalidates the cache once a plan has
//! actually been committed.

pub mod cache;
pub mod differentiate;
pub mod plan;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use curation_core::{Classification, CurationResult, HierarchyView, Node};
use curation_store::{CodeMutation, NodeStore};

pub use cache::HierarchyCache;
pub use differentiate::{Candidate, DifferentiatorLevel};
pub use plan::{validate_plan, ExistingSibling, RestructureContext, RestructurePlan};

/// Both views' base paths for one classification — `SEG.CAT.CT` for the
/// function view, `ORG.CAT.CT` for the organization view.
pub fn base_path(view: HierarchyView, classification: &Classification) -> String {
    match view {
        HierarchyView::Function => format!(
            "{}.{}.{}",
            classification.segment, classification.category, classification.content_type
        ),
        HierarchyView::Organization => format!(
            "{}.{}.{}",
            classification.organization, classification.category, classification.content_type
        ),
    }
}

/// The attributes a brand-new (not-yet-persisted) node contributes to
/// sibling differentiation.
#[derive(Debug, Clone)]
pub struct NewNodeAttributes {
    pub company: Option<String>,
    pub source_domain: String,
    pub earliest_metadata_tag: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Both views' plans for one import, produced together since planning
/// never fails independently per view (§4.8 step 5).
#[derive(Debug, Clone)]
pub struct DualViewPlan {
    pub function: RestructurePlan,
    pub organization: RestructurePlan,
}

impl DualViewPlan {
    pub fn all_mutations(&self) -> Vec<CodeMutation> {
        let mut mutations = self.function.mutations.clone();
        mutations.extend(self.organization.mutations.clone());
        mutations
    }
}

pub struct HierarchyEngine {
    store: Arc<NodeStore>,
    cache: HierarchyCache,
}

impl HierarchyEngine {
    pub fn new(store: Arc<NodeStore>) -> Self {
        let cache = HierarchyCache::new(store.clone());
        Self { store, cache }
    }

    pub fn cache(&self) -> &HierarchyCache {
        &self.cache
    }

    /// Plan hierarchy-code assignment for both views for a new node. Does
    /// not touch the store — only reads the current sibling set.
    pub async fn plan_new_node(
        &self,
        classification: &Classification,
        attrs: &NewNodeAttributes,
    ) -> CurationResult<DualViewPlan> {
        self.plan_dual(classification, attrs, None).await
    }

    /// Plan hierarchy-code assignment for both views for a node that
    /// already exists (forced re-import, §4.8 step 2; enrichment
    /// reclassification, §4.7) — the node's own current row is excluded
    /// from the sibling set it's being planned against, since it would
    /// otherwise be counted as its own conflicting sibling.
    pub async fn plan_reclassified_node(
        &self,
        node_id: curation_core::NodeId,
        classification: &Classification,
        attrs: &NewNodeAttributes,
    ) -> CurationResult<DualViewPlan> {
        self.plan_dual(classification, attrs, Some(node_id)).await
    }

    async fn plan_dual(
        &self,
        classification: &Classification,
        attrs: &NewNodeAttributes,
        exclude_node_id: Option<curation_core::NodeId>,
    ) -> CurationResult<DualViewPlan> {
        let function = self
            .plan_one_view(HierarchyView::Function, classification, attrs, exclude_node_id)
            .await?;
        let organization = self
            .plan_one_view(HierarchyView::Organization, classification, attrs, exclude_node_id)
            .await?;

        validate_plan(&function)?;
        validate_plan(&organization)?;

        Ok(DualViewPlan {
            function,
            organization,
        })
    }

    async fn plan_one_view(
        &self,
        view: HierarchyView,
        classification: &Classification,
        attrs: &NewNodeAttributes,
        exclude_node_id: Option<curation_core::NodeId>,
    ) -> CurationResult<RestructurePlan> {
        let base = base_path(view, classification);
        let mut existing = self.store.get_subtree(view, &base).await?;
        if let Some(exclude) = exclude_node_id {
            existing.retain(|n| n.id != exclude);
        }
        existing.sort_by_key(|n| n.created_at);

        let siblings = existing
            .iter()
            .enumerate()
            .map(|(order, node)| ExistingSibling {
                node_id: node.id,
                current_code: node.hierarchy_code(view).to_string(),
                candidate: Candidate::from_node(node, order),
            })
            .collect::<Vec<_>>();

        let new_candidate = Candidate {
            node_id: exclude_node_id,
            company: attrs.company.clone(),
            source_domain: attrs.source_domain.clone(),
            earliest_metadata_tag: attrs.earliest_metadata_tag.clone(),
            created_at: attrs.created_at,
            insertion_order: siblings.len(),
        };

        let ctx = RestructureContext {
            view,
            base_path: base,
            new_candidate,
            siblings,
        };

        Ok(plan::plan_restructure(&ctx))
    }

    /// Invalidate the cache after a plan has been committed. Uses the
    /// targeted invalidation path when the plan names which codes moved;
    /// falls back to coarse invalidation otherwise is never necessary here
    /// since every commit produces at least the new node's own code.
    pub fn invalidate_after_commit(&self, plan: &DualViewPlan) {
        let mutations = plan.all_mutations();
        self.cache.invalidate_targeted(&mutations);
        self.cache.invalidate_all();
    }

    pub async fn get_tree(&self, view: HierarchyView) -> CurationResult<Arc<Vec<Node>>> {
        self.cache.get_tree(view).await
    }

    pub async fn get_subtree(
        &self,
        view: HierarchyView,
        path: &str,
    ) -> CurationResult<Arc<Vec<Node>>> {
        self.cache.get_subtree(view, path).await
    }

    pub async fn get_ancestry(
        &self,
        view: HierarchyView,
        node_id: curation_core::NodeId,
    ) -> CurationResult<Arc<Vec<Node>>> {
        self.cache.get_ancestry(view, node_id).await
    }

    pub async fn get_node_by_hierarchy_code(
        &self,
        view: HierarchyView,
        code: &str,
    ) -> CurationResult<Arc<Option<Node>>> {
        self.cache.get_node_by_hierarchy_code(view, code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_core::NodeDraft;
    use curation_store::NewNodeCodes;

    fn classification() -> Classification {
        Classification {
            segment: 'T',
            category: "DEV".to_string(),
            content_type: 'A',
            organization: "INDI".to_string(),
            confidence: 0.9,
            reasoning: None,
            from_cache: false,
            fallback: false,
        }
    }

    fn attrs(domain: &str) -> NewNodeAttributes {
        NewNodeAttributes {
            company: None,
            source_domain: domain.to_string(),
            earliest_metadata_tag: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn first_node_gets_dot_one_on_both_views() {
        let store = Arc::new(NodeStore::connect("sqlite::memory:").await.unwrap());
        let engine = HierarchyEngine::new(store);
        let plan = engine
            .plan_new_node(&classification(), &attrs("example.com"))
            .await
            .unwrap();
        assert_eq!(plan.function.new_code, "T.DEV.A.1");
        assert_eq!(plan.organization.new_code, "INDI.DEV.A.1");
    }

    #[tokio::test]
    async fn reclassify_excludes_the_node_itself_from_its_own_sibling_set() {
        let store = Arc::new(NodeStore::connect("sqlite::memory:").await.unwrap());
        let engine = HierarchyEngine::new(store.clone());

        let draft = NodeDraft {
            title: "first".to_string(),
            source_url: "https://a.example.com".to_string(),
            source_domain: "a.example.com".to_string(),
            company: None,
            extracted_fields: serde_json::Value::Null,
            classification: classification(),
            metadata_tags: Vec::new(),
        };
        let plan = engine
            .plan_new_node(&classification(), &attrs("a.example.com"))
            .await
            .unwrap();
        let node = store
            .create(
                &draft,
                NewNodeCodes {
                    function_code: plan.function.new_code.clone(),
                    organization_code: plan.organization.new_code.clone(),
                },
                Vec::new(),
                Vec::new(),
                None,
            )
            .await
            .unwrap();
        engine.invalidate_after_commit(&plan);

        // re-planning the same node against the same classification must
        // not see its own existing row as a conflicting sibling.
        let replan = engine
            .plan_reclassified_node(node.id, &classification(), &attrs("a.example.com"))
            .await
            .unwrap();
        assert_eq!(replan.function.new_code, "T.DEV.A.1");
        assert_eq!(replan.organization.new_code, "INDI.DEV.A.1");
        assert!(!replan.function.any_sibling_changed);
        assert!(!replan.organization.any_sibling_changed);
    }

    #[tokio::test]
    async fn second_node_with_same_classification_gets_dot_two() {
        let store = Arc::new(NodeStore::connect("sqlite::memory:").await.unwrap());
        let engine = HierarchyEngine::new(store.clone());

        let draft = NodeDraft {
            title: "first".to_string(),
            source_url: "https://a.example.com".to_string(),
            source_domain: "a.example.com".to_string(),
            company: None,
            extracted_fields: serde_json::Value::Null,
            classification: classification(),
            metadata_tags: Vec::new(),
        };
        let plan1 = engine
            .plan_new_node(&classification(), &attrs("a.example.com"))
            .await
            .unwrap();
        store
            .create(
                &draft,
                NewNodeCodes {
                    function_code: plan1.function.new_code.clone(),
                    organization_code: plan1.organization.new_code.clone(),
                },
                Vec::new(),
                Vec::new(),
                None,
            )
            .await
            .unwrap();
        engine.invalidate_after_commit(&plan1);

        let plan2 = engine
            .plan_new_node(&classification(), &attrs("b.example.com"))
            .await
            .unwrap();
        assert_eq!(plan2.function.new_code, "T.DEV.A.2");
        assert_eq!(plan2.organization.new_code, "INDI.DEV.A.2");
    }
}
