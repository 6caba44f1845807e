//! `planRestructure` / validation (§4.5): pure functions over a candidate
//! set, no I/O. The caller (the hierarchy engine in `lib.rs`) is
//! responsible for gathering the sibling set and, separately, for
//! executing the plan inside the store's transaction.

use once_cell::sync::Lazy;
use regex::Regex;

use curation_core::{CurationError, CurationResult, ErrorKind, HierarchyView, NodeId};
use curation_store::CodeMutation;

use crate::differentiate::{find_best_differentiator, Candidate, DifferentiatorLevel};

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]+\.[A-Z0-9]+\.[A-Z](\.[A-Za-z0-9]+)*$").unwrap());

/// depth-limited recursion: at the cap siblings are assigned raw indices
/// in insertion order rather than differentiated further.
const MAX_RECURSION_DEPTH: usize = 10;

/// One existing sibling's current position, carried alongside the
/// attributes `findBestDifferentiator` reasons over.
#[derive(Debug, Clone)]
pub struct ExistingSibling {
    pub node_id: NodeId,
    pub current_code: String,
    pub candidate: Candidate,
}

/// Everything `planRestructure` needs: the new node's attributes, the
/// base path it classified into, and whatever already lives there.
#[derive(Debug, Clone)]
pub struct RestructureContext {
    pub view: HierarchyView,
    pub base_path: String,
    pub new_candidate: Candidate,
    pub siblings: Vec<ExistingSibling>,
}

#[derive(Debug, Clone)]
pub struct RestructurePlan {
    pub new_code: String,
    pub mutations: Vec<CodeMutation>,
    pub any_sibling_changed: bool,
    pub description: String,
}

/// Plan the hierarchy-code assignment for a newly imported node, and any
/// renumbering its arrival forces on existing siblings.
pub fn plan_restructure(ctx: &RestructureContext) -> RestructurePlan {
    if ctx.siblings.is_empty() {
        return RestructurePlan {
            new_code: format!("{}.1", ctx.base_path),
            mutations: Vec::new(),
            any_sibling_changed: false,
            description: "no conflict: first node at this path".to_string(),
        };
    }

    // index 0 is always the new node; siblings keep their relative order
    // and sort after it only by virtue of comparing insertion_order.
    let mut candidates = vec![ctx.new_candidate.clone()];
    candidates.extend(ctx.siblings.iter().map(|s| s.candidate.clone()));

    let (level, _) = find_best_differentiator(&candidates);
    let all_indices: Vec<usize> = (0..candidates.len()).collect();
    let assignment = assign(&all_indices, &candidates, 0);

    let mut new_code = String::new();
    let mut mutations = Vec::new();
    let mut any_sibling_changed = false;

    for (idx, chain) in assignment {
        let code = format!(
            "{}.{}",
            ctx.base_path,
            chain
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(".")
        );
        if idx == 0 {
            new_code = code;
        } else {
            let sibling = &ctx.siblings[idx - 1];
            if sibling.current_code != code {
                any_sibling_changed = true;
                mutations.push(CodeMutation {
                    node_id: sibling.node_id,
                    old_code: sibling.current_code.clone(),
                    new_code: code,
                    view: ctx.view,
                });
            }
        }
    }

    let description = format!(
        "split {} node(s) by {:?} into {} path(s), {} sibling(s) renumbered",
        candidates.len(),
        level,
        ctx.base_path,
        mutations.len()
    );

    RestructurePlan {
        new_code,
        mutations,
        any_sibling_changed,
        description,
    }
}

/// Recursively partition `group` (indices into `candidates`) into
/// 1-based sub-segment chains. Groups of size 1, or any group once the
/// recursion cap is hit, are assigned raw insertion-order indices instead
/// of differentiated further.
///
/// A company split is the one differentiation level where even a
/// singleton group still gets a within-group trailing index: each company
/// occupies its own sub-segment, and the single node inside it is `.1` of
/// that sub-segment rather than sharing the parent path directly. A
/// company conflict between two single nodes produces `BASE.1.1` and
/// `BASE.2.1`, not `BASE.1` and `BASE.2`. Every other level (domain, tag,
/// date bucket, insertion order) keeps the flat index for a singleton
/// group.
fn assign(
    group: &[usize],
    candidates: &[Candidate],
    depth: usize,
) -> Vec<(usize, Vec<usize>)> {
    if group.len() <= 1 || depth >= MAX_RECURSION_DEPTH {
        let mut ordered = group.to_vec();
        ordered.sort_by_key(|&i| candidates[i].insertion_order);
        return ordered
            .into_iter()
            .enumerate()
            .map(|(pos, i)| (i, vec![pos + 1]))
            .collect();
    }

    let sub_candidates: Vec<Candidate> = group.iter().map(|&i| candidates[i].clone()).collect();
    let (level, sub_groups) = find_best_differentiator(&sub_candidates);

    let mut result = Vec::new();
    for (group_index, local_group) in sub_groups.iter().enumerate() {
        let global_group: Vec<usize> = local_group.iter().map(|&local_i| group[local_i]).collect();
        if global_group.len() > 1 || level == DifferentiatorLevel::Company {
            for (idx, mut chain) in assign(&global_group, candidates, depth + 1) {
                let mut full = vec![group_index + 1];
                full.append(&mut chain);
                result.push((idx, full));
            }
        } else {
            result.push((global_group[0], vec![group_index + 1]));
        }
    }
    result
}

/// Validate a plan before it is handed to the store: every resulting code
/// must be non-empty, match the hierarchy-code grammar, and be unique.
/// Failures here are programming errors — the caller aborts the import
/// with no persisted change rather than retrying.
pub fn validate_plan(plan: &RestructurePlan) -> CurationResult<()> {
    let mut all_codes = vec![plan.new_code.clone()];
    all_codes.extend(plan.mutations.iter().map(|m| m.new_code.clone()));

    for code in &all_codes {
        if code.is_empty() {
            return Err(CurationError::new(
                ErrorKind::InternalError,
                "restructure plan produced an empty hierarchy code",
            ));
        }
        if !CODE_PATTERN.is_match(code) {
            return Err(CurationError::new(
                ErrorKind::InternalError,
                format!("restructure plan produced an invalid hierarchy code: {code}"),
            ));
        }
    }

    let mut seen = std::collections::HashSet::new();
    for code in &all_codes {
        if !seen.insert(code.clone()) {
            return Err(CurationError::new(
                ErrorKind::InternalError,
                format!("restructure plan produced a duplicate hierarchy code: {code}"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn candidate(company: Option<&str>, domain: &str, order: usize) -> Candidate {
        Candidate {
            node_id: None,
            company: company.map(String::from),
            source_domain: domain.to_string(),
            earliest_metadata_tag: None,
            created_at: Utc::now(),
            insertion_order: order,
        }
    }

    #[test]
    fn first_node_at_path_has_no_conflict() {
        let ctx = RestructureContext {
            view: HierarchyView::Function,
            base_path: "T.DEV.A".to_string(),
            new_candidate: candidate(None, "example.com", 0),
            siblings: Vec::new(),
        };
        let plan = plan_restructure(&ctx);
        assert_eq!(plan.new_code, "T.DEV.A.1");
        assert!(plan.mutations.is_empty());
        assert!(!plan.any_sibling_changed);
        validate_plan(&plan).unwrap();
    }

    #[test]
    fn conflicting_company_splits_into_two_sub_segments() {
        let sibling_id = Uuid::new_v4();
        let ctx = RestructureContext {
            view: HierarchyView::Function,
            base_path: "T.DEV.A".to_string(),
            new_candidate: candidate(Some("OpenAI"), "openai.com", 1),
            siblings: vec![ExistingSibling {
                node_id: sibling_id,
                current_code: "T.DEV.A.1".to_string(),
                candidate: candidate(Some("Anthropic"), "anthropic.com", 0),
            }],
        };
        let plan = plan_restructure(&ctx);
        // a real (company) differentiator split: each company gets its own
        // sub-segment, and within it the lone member still takes `.1` —
        // the existing sibling is renumbered rather than left alone.
        assert_eq!(plan.new_code, "T.DEV.A.2.1");
        assert!(plan.any_sibling_changed);
        assert_eq!(plan.mutations.len(), 1);
        assert_eq!(plan.mutations[0].node_id, sibling_id);
        assert_eq!(plan.mutations[0].old_code, "T.DEV.A.1");
        assert_eq!(plan.mutations[0].new_code, "T.DEV.A.1.1");
        validate_plan(&plan).unwrap();
    }

    #[test]
    fn identical_siblings_keep_stable_codes_when_nothing_changes() {
        let sibling_id = Uuid::new_v4();
        let ctx = RestructureContext {
            view: HierarchyView::Function,
            base_path: "T.DEV.A".to_string(),
            new_candidate: candidate(None, "same.com", 1),
            siblings: vec![ExistingSibling {
                node_id: sibling_id,
                current_code: "T.DEV.A.1".to_string(),
                candidate: candidate(None, "same.com", 0),
            }],
        };
        let plan = plan_restructure(&ctx);
        // existing sibling keeps index 1 (lowest insertion_order), new
        // node takes index 2 — no mutation needed for the sibling.
        assert!(!plan.any_sibling_changed);
        assert_eq!(plan.new_code, "T.DEV.A.2");
        validate_plan(&plan).unwrap();
    }

    #[test]
    fn rejects_duplicate_codes() {
        let plan = RestructurePlan {
            new_code: "T.DEV.A.1".to_string(),
            mutations: vec![CodeMutation {
                node_id: Uuid::new_v4(),
                old_code: "T.DEV.A.2".to_string(),
                new_code: "T.DEV.A.1".to_string(),
                view: HierarchyView::Function,
            }],
            any_sibling_changed: true,
            description: String::new(),
        };
        assert!(validate_plan(&plan).is_err());
    }

    #[test]
    fn rejects_malformed_codes() {
        let plan = RestructurePlan {
            new_code: "lowercase.path.a".to_string(),
            mutations: Vec::new(),
            any_sibling_changed: false,
            description: String::new(),
        };
        assert!(validate_plan(&plan).is_err());
    }
}
