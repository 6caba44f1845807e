//! "Regenerate hierarchy codes if classification changed" (§4.7). Phase 2
//! never touches a node's segment/category/content-type/organization
//! letters — those are fixed at Phase-1 classification — but it can learn
//! a `company` the Phase-1 pass missed, and company is the first rung of
//! the differentiation ladder (`curation_hierarchy::differentiate`). So a
//! newly-learned company can still force the same kind of sibling split
//! that a brand-new conflicting import would, at the node's existing base
//! path. This reuses the hierarchy crate's own planning primitives rather
//! than re-deriving them, the way `HierarchyEngine::plan_one_view` does
//! for a genuinely new node.

use curation_core::{Classification, CurationResult, HierarchyView, Node, NodeId};
use curation_hierarchy::differentiate::Candidate;
use curation_hierarchy::plan::{plan_restructure, validate_plan, ExistingSibling, RestructureContext};
use curation_hierarchy::{base_path, DualViewPlan, HierarchyEngine, RestructurePlan};
use curation_store::{NewNodeCodes, NodeStore};

fn classification_from_node(node: &Node) -> Classification {
    Classification {
        segment: node.segment_code.chars().next().unwrap_or('T'),
        category: node.category_code.clone(),
        content_type: node.content_type_code.chars().next().unwrap_or('A'),
        organization: node.organization_code.clone(),
        confidence: 1.0,
        reasoning: None,
        from_cache: false,
        fallback: false,
    }
}

async fn plan_one_view(
    store: &NodeStore,
    view: HierarchyView,
    node_id: NodeId,
    node: &Node,
    classification: &Classification,
) -> CurationResult<RestructurePlan> {
    let base = base_path(view, classification);
    let mut siblings_raw = store.get_subtree(view, &base).await?;
    siblings_raw.retain(|n| n.id != node_id);
    siblings_raw.sort_by_key(|n| n.created_at);

    let siblings: Vec<ExistingSibling> = siblings_raw
        .iter()
        .enumerate()
        .map(|(order, n)| ExistingSibling {
            node_id: n.id,
            current_code: n.hierarchy_code(view).to_string(),
            candidate: Candidate::from_node(n, order),
        })
        .collect();

    let new_candidate = Candidate {
        node_id: Some(node_id),
        company: node.company.clone(),
        source_domain: node.source_domain.clone(),
        earliest_metadata_tag: node.metadata_tags.first().cloned(),
        created_at: node.created_at,
        insertion_order: siblings.len(),
    };

    let ctx = RestructureContext {
        view,
        base_path: base,
        new_candidate,
        siblings,
    };

    let plan = plan_restructure(&ctx);
    validate_plan(&plan)?;
    Ok(plan)
}

/// Re-plans both hierarchy views for `node` as it stands after an
/// enrichment update, and commits a restructure if either view's code (or
/// any sibling's) actually changed. Returns a human-readable description
/// of what moved, or `None` if nothing did.
pub async fn regenerate_if_changed(
    store: &NodeStore,
    hierarchy: &HierarchyEngine,
    node_id: NodeId,
    before_company: &Option<String>,
    after: &Node,
) -> CurationResult<Option<String>> {
    if before_company == &after.company {
        return Ok(None);
    }

    let classification = classification_from_node(after);
    let function = plan_one_view(store, HierarchyView::Function, node_id, after, &classification).await?;
    let organization =
        plan_one_view(store, HierarchyView::Organization, node_id, after, &classification).await?;

    let changed = function.new_code != after.function_hierarchy_code
        || organization.new_code != after.organization_hierarchy_code
        || function.any_sibling_changed
        || organization.any_sibling_changed;

    if !changed {
        return Ok(None);
    }

    let description = format!(
        "company changed, function: {}; organization: {}",
        function.description, organization.description
    );

    let new_codes = NewNodeCodes {
        function_code: function.new_code.clone(),
        organization_code: organization.new_code.clone(),
    };
    let mut mutations = function.mutations.clone();
    mutations.extend(organization.mutations.clone());

    store.apply_restructure(new_codes, node_id, mutations).await?;
    hierarchy.invalidate_after_commit(&DualViewPlan {
        function,
        organization,
    });

    Ok(Some(description))
}
