//! `findBestDifferentiator` (§4.5): the tie-breaking ladder used to split a
//! set of siblings that collide on `(segment, category, contentType)`.

use chrono::Datelike;
use curation_core::Node;
use std::collections::BTreeMap;

/// A candidate node for differentiation — either the new node being
/// imported or an existing sibling already at the conflicting base path.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node_id: Option<curation_core::NodeId>,
    pub company: Option<String>,
    pub source_domain: String,
    pub earliest_metadata_tag: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Insertion order — the new node sorts after every existing sibling;
    /// among existing siblings this is their current group order.
    pub insertion_order: usize,
}

impl Candidate {
    pub fn from_node(node: &Node, insertion_order: usize) -> Self {
        Self {
            node_id: Some(node.id),
            company: node.company.clone(),
            source_domain: node.source_domain.clone(),
            earliest_metadata_tag: node.metadata_tags.first().cloned(),
            created_at: node.created_at,
            insertion_order,
        }
    }
}

/// The differentiation level chosen for one partitioning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferentiatorLevel {
    Company,
    SourceDomain,
    EarliestMetadataTag,
    CreationDateBucket,
    InsertionOrder,
}

/// Partition `candidates` using the highest-priority level that yields at
/// least two non-empty groups; falls back to insertion order (which is
/// never ambiguous — every candidate has a distinct position).
pub fn find_best_differentiator(
    candidates: &[Candidate],
) -> (DifferentiatorLevel, Vec<Vec<usize>>) {
    let by_company = group_by(candidates, |c| c.company.clone());
    if by_company.len() >= 2 {
        return (DifferentiatorLevel::Company, by_company);
    }

    let by_domain = group_by(candidates, |c| Some(c.source_domain.clone()));
    if by_domain.len() >= 2 {
        return (DifferentiatorLevel::SourceDomain, by_domain);
    }

    let by_tag = group_by(candidates, |c| c.earliest_metadata_tag.clone());
    if by_tag.len() >= 2 {
        return (DifferentiatorLevel::EarliestMetadataTag, by_tag);
    }

    let by_bucket = group_by(candidates, |c| {
        Some(format!("{}-{:02}", c.created_at.year(), c.created_at.month()))
    });
    if by_bucket.len() >= 2 {
        return (DifferentiatorLevel::CreationDateBucket, by_bucket);
    }

    let groups: Vec<Vec<usize>> = candidates
        .iter()
        .enumerate()
        .map(|(i, _)| vec![i])
        .collect();
    (DifferentiatorLevel::InsertionOrder, groups)
}

/// Group candidate indices by a derived key, skipping `None` keys into
/// their own unmatched group (they never differentiate from each other).
/// Groups are ordered by the candidates' insertion order within each group
/// so assignment is deterministic.
fn group_by<F>(candidates: &[Candidate], key_fn: F) -> Vec<Vec<usize>>
where
    F: Fn(&Candidate) -> Option<String>,
{
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut none_bucket = Vec::new();
    for (i, c) in candidates.iter().enumerate() {
        match key_fn(c) {
            Some(key) if !key.trim().is_empty() => groups.entry(key).or_default().push(i),
            _ => none_bucket.push(i),
        }
    }
    let mut non_empty_count = groups.values().filter(|g| !g.is_empty()).count();
    if !none_bucket.is_empty() {
        non_empty_count += 1;
    }
    if non_empty_count < 2 {
        return Vec::new();
    }
    let mut result: Vec<Vec<usize>> = groups.into_values().collect();
    if !none_bucket.is_empty() {
        result.push(none_bucket);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn candidate(company: Option<&str>, domain: &str, order: usize) -> Candidate {
        Candidate {
            node_id: Some(Uuid::new_v4()),
            company: company.map(String::from),
            source_domain: domain.to_string(),
            earliest_metadata_tag: None,
            created_at: Utc::now(),
            insertion_order: order,
        }
    }

    #[test]
    fn prefers_company_split_when_distinct() {
        let candidates = vec![
            candidate(Some("Anthropic"), "anthropic.com", 0),
            candidate(Some("OpenAI"), "openai.com", 1),
        ];
        let (level, groups) = find_best_differentiator(&candidates);
        assert_eq!(level, DifferentiatorLevel::Company);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn falls_back_to_domain_when_company_absent() {
        let candidates = vec![
            candidate(None, "a.com", 0),
            candidate(None, "b.com", 1),
        ];
        let (level, groups) = find_best_differentiator(&candidates);
        assert_eq!(level, DifferentiatorLevel::SourceDomain);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn falls_back_to_insertion_order_when_nothing_differentiates() {
        let candidates = vec![
            candidate(None, "same.com", 0),
            candidate(None, "same.com", 1),
        ];
        let (level, groups) = find_best_differentiator(&candidates);
        assert_eq!(level, DifferentiatorLevel::InsertionOrder);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec![0]);
        assert_eq!(groups[1], vec![1]);
    }
}
