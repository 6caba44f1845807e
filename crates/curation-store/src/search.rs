//! Keyword + facet search (§4.4): FTS on title/description/summary/company/
//! domain, equality filters on the four classification codes, optional
//! date-range and `hasMetadata` filters, and facet counts over the
//! filtered-but-unpaginated result set.

use chrono::{DateTime, Utc};
use curation_core::{CurationResult, Node};
use serde::Serialize;

use crate::error::from_sqlx;
use crate::model::NodeRow;
use crate::pagination::Pagination;
use crate::NodeStore;

#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub segment: Option<String>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub organization: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Resolved per DESIGN.md's open-question decision: presence of any
    /// metadata link at or above `confidence_threshold`, not a requirement
    /// that Phase 2 has fully completed.
    pub has_metadata: Option<bool>,
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetCounts {
    pub segments: Vec<(String, i64)>,
    pub categories: Vec<(String, i64)>,
    pub content_types: Vec<(String, i64)>,
    pub organizations: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub data: Vec<Node>,
    pub pagination: Pagination,
    pub facets: FacetCounts,
}

/// Turn free-text user input into a safe FTS5 MATCH expression: each token
/// is quoted and prefix-matched, joined with AND. Empty/whitespace-only
/// input matches everything (filters alone still apply).
fn sanitize_fts_query(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|t| t.replace('"', ""))
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\"*"))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" AND "))
    }
}

struct WhereClause {
    sql: String,
    binds: Vec<String>,
}

fn build_where(filter: &SearchFilter) -> WhereClause {
    let mut clauses = vec!["nodes.is_deleted = 0".to_string()];
    let mut binds = Vec::new();

    if let Some(s) = &filter.segment {
        clauses.push("nodes.segment_code = ?".to_string());
        binds.push(s.clone());
    }
    if let Some(c) = &filter.category {
        clauses.push("nodes.category_code = ?".to_string());
        binds.push(c.clone());
    }
    if let Some(t) = &filter.content_type {
        clauses.push("nodes.content_type_code = ?".to_string());
        binds.push(t.clone());
    }
    if let Some(o) = &filter.organization {
        clauses.push("nodes.organization_code = ?".to_string());
        binds.push(o.clone());
    }
    if let Some(from) = &filter.date_from {
        clauses.push("nodes.date_added >= ?".to_string());
        binds.push(from.to_rfc3339());
    }
    if let Some(to) = &filter.date_to {
        clauses.push("nodes.date_added <= ?".to_string());
        binds.push(to.to_rfc3339());
    }
    if let Some(has) = filter.has_metadata {
        let exists = format!(
            "EXISTS (SELECT 1 FROM node_metadata nm WHERE nm.node_id = nodes.id AND nm.confidence >= {})",
            filter.confidence_threshold
        );
        clauses.push(if has {
            exists
        } else {
            format!("NOT {exists}")
        });
    }

    WhereClause {
        sql: clauses.join(" AND "),
        binds,
    }
}

impl NodeStore {
    pub async fn keyword_search(
        &self,
        query: &str,
        filter: &SearchFilter,
        page: u32,
        limit: u32,
    ) -> CurationResult<SearchResult> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let where_clause = build_where(filter);
        let fts = sanitize_fts_query(query);

        let (from, mut base_binds, match_clause) = match &fts {
            Some(expr) => (
                "nodes JOIN nodes_fts ON nodes_fts.node_id = nodes.id",
                vec![expr.clone()],
                "nodes_fts MATCH ? AND",
            ),
            None => ("nodes", Vec::new(), ""),
        };
        base_binds.extend(where_clause.binds.clone());

        let count_sql = format!(
            "SELECT COUNT(*) FROM {from} WHERE {match_clause} {where}",
            where = where_clause.sql
        );
        let mut cq = sqlx::query_scalar::<_, i64>(&count_sql);
        for b in &base_binds {
            cq = cq.bind(b);
        }
        let total: i64 = cq.fetch_one(&self.pool).await.map_err(from_sqlx)?;

        let data_sql = format!(
            "SELECT nodes.* FROM {from} WHERE {match_clause} {where} ORDER BY nodes.date_added DESC LIMIT ? OFFSET ?",
            where = where_clause.sql
        );
        let mut dq = sqlx::query_as::<_, NodeRow>(&data_sql);
        for b in &base_binds {
            dq = dq.bind(b);
        }
        dq = dq.bind(limit as i64).bind(((page - 1) * limit) as i64);
        let rows = dq.fetch_all(&self.pool).await.map_err(from_sqlx)?;
        let data: Vec<Node> = rows.into_iter().map(NodeRow::into_node).collect();

        let facets = self
            .compute_facets(from, match_clause, &where_clause, &base_binds)
            .await?;

        Ok(SearchResult {
            data,
            pagination: Pagination::new(page, limit, total as u64),
            facets,
        })
    }

    async fn compute_facets(
        &self,
        from: &str,
        match_clause: &str,
        where_clause: &WhereClause,
        binds: &[String],
    ) -> CurationResult<FacetCounts> {
        let segments = self
            .facet_column(from, match_clause, where_clause, binds, "nodes.segment_code")
            .await?;
        let categories = self
            .facet_column(from, match_clause, where_clause, binds, "nodes.category_code")
            .await?;
        let content_types = self
            .facet_column(from, match_clause, where_clause, binds, "nodes.content_type_code")
            .await?;
        let organizations = self
            .facet_column(from, match_clause, where_clause, binds, "nodes.organization_code")
            .await?;
        Ok(FacetCounts {
            segments,
            categories,
            content_types,
            organizations,
        })
    }

    async fn facet_column(
        &self,
        from: &str,
        match_clause: &str,
        where_clause: &WhereClause,
        binds: &[String],
        column: &str,
    ) -> CurationResult<Vec<(String, i64)>> {
        let sql = format!(
            "SELECT {column}, COUNT(*) as cnt FROM {from} WHERE {match_clause} {where} GROUP BY {column} ORDER BY cnt DESC LIMIT 20",
            where = where_clause.sql
        );
        let mut q = sqlx::query_as::<_, (String, i64)>(&sql);
        for b in binds {
            q = q.bind(b);
        }
        q.fetch_all(&self.pool).await.map_err(from_sqlx)
    }
}
