//! Node CRUD plus the hierarchy-aware reads (`getSubtree`, `getAncestry`,
//! `getNodeByHierarchyCode`). Creation, restructure-mutation application,
//! metadata insertion, FTS indexing, and audit logging all run inside one
//! transaction — this is the "single commit point" the Import Orchestrator
//! relies on (spec §4.8 step 6).

use chrono::Utc;
use curation_core::{
    AuditEntry, ChangeType, CurationResult, HierarchyView, MetadataCode, Node, NodeDelta, NodeId,
    NodeDraft, TriggeredBy,
};
use uuid::Uuid;

use crate::error::from_sqlx;
use crate::model::{CodeMutation, NodeRow};
use crate::pagination::{Pagination, PaginatedResult};
use crate::NodeStore;

/// The two hierarchy codes assigned to a node at creation, computed by the
/// Hierarchy Engine's restructure plan for each view.
#[derive(Debug, Clone)]
pub struct NewNodeCodes {
    pub function_code: String,
    pub organization_code: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub segment: Option<String>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub organization: Option<String>,
}

impl NodeStore {
    /// Insert a new node, apply any sibling restructure mutations, register
    /// its Phase-1 metadata codes, write the FTS row, and append one audit
    /// entry per touched node — all within a single transaction.
    pub async fn create(
        &self,
        draft: &NodeDraft,
        codes: NewNodeCodes,
        mutations: Vec<CodeMutation>,
        metadata_codes: Vec<MetadataCode>,
        reason: Option<String>,
    ) -> CurationResult<Node> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;
        let now = Utc::now();
        let id = Uuid::new_v4();

        let mut node = Node {
            id,
            title: draft.title.clone(),
            source_url: draft.source_url.clone(),
            source_domain: draft.source_domain.clone(),
            company: draft.company.clone(),
            extracted_fields: draft.extracted_fields.clone(),
            metadata_tags: draft.metadata_tags.clone(),
            ai_summary: None,
            phrase_description: None,
            short_description: None,
            key_concepts: Vec::new(),
            logo_url: None,
            segment_code: draft.classification.segment.to_string(),
            category_code: draft.classification.category.clone(),
            content_type_code: draft.classification.content_type.to_string(),
            organization_code: draft.classification.organization.clone(),
            function_hierarchy_code: codes.function_code,
            organization_hierarchy_code: codes.organization_code,
            descriptor: String::new(),
            is_deleted: false,
            date_added: now,
            created_at: now,
            updated_at: now,
        };
        node.rebuild_descriptor();

        sqlx::query(
            r#"
            INSERT INTO nodes (
                id, title, source_url, source_domain, company,
                segment_code, category_code, content_type_code, organization_code,
                function_hierarchy_code, organization_hierarchy_code,
                extracted_fields, metadata_tags, short_description, phrase_description,
                ai_summary, key_concepts, descriptor, logo_url, is_deleted,
                date_added, created_at, updated_at
            ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
            "#,
        )
        .bind(node.id.to_string())
        .bind(&node.title)
        .bind(&node.source_url)
        .bind(&node.source_domain)
        .bind(&node.company)
        .bind(&node.segment_code)
        .bind(&node.category_code)
        .bind(&node.content_type_code)
        .bind(&node.organization_code)
        .bind(&node.function_hierarchy_code)
        .bind(&node.organization_hierarchy_code)
        .bind(node.extracted_fields.to_string())
        .bind(serde_json::to_string(&node.metadata_tags).unwrap_or_default())
        .bind(&node.short_description)
        .bind(&node.phrase_description)
        .bind(&node.ai_summary)
        .bind(serde_json::to_string(&node.key_concepts).unwrap_or_default())
        .bind(&node.descriptor)
        .bind(&node.logo_url)
        .bind(0_i64)
        .bind(node.date_added.to_rfc3339())
        .bind(node.created_at.to_rfc3339())
        .bind(node.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        for m in &mutations {
            let column = match m.view {
                HierarchyView::Function => "function_hierarchy_code",
                HierarchyView::Organization => "organization_hierarchy_code",
            };
            let sql = format!(
                "UPDATE nodes SET {column} = ?, updated_at = ? WHERE id = ? AND is_deleted = 0"
            );
            sqlx::query(&sql)
                .bind(&m.new_code)
                .bind(now.to_rfc3339())
                .bind(m.node_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(from_sqlx)?;

            insert_audit(
                &mut tx,
                m.node_id,
                m.view,
                Some(m.old_code.clone()),
                Some(m.new_code.clone()),
                ChangeType::Restructured,
                TriggeredBy::Restructure,
                reason.clone(),
                vec![id],
            )
            .await?;

            if let Some(mirror) = fetch_for_fts(&mut tx, m.node_id).await? {
                crate::fts::upsert(&mut tx, &mirror).await?;
            }
        }

        for view in [HierarchyView::Function, HierarchyView::Organization] {
            insert_audit(
                &mut tx,
                id,
                view,
                None,
                Some(node.hierarchy_code(view).to_string()),
                ChangeType::Created,
                TriggeredBy::Import,
                reason.clone(),
                Vec::new(),
            )
            .await?;
        }

        for code in &metadata_codes {
            crate::metadata::add_one(&mut tx, id, code).await?;
        }

        crate::fts::upsert(&mut tx, &node).await?;
        tx.commit().await.map_err(from_sqlx)?;
        Ok(node)
    }

    /// Re-run Phase-1 classification against an already-imported node
    /// (forced re-import, §4.8 step 2): updates title, domain, and
    /// classification codes, applies any resulting restructure mutations,
    /// and replaces metadata codes — all but the metadata replace in one
    /// transaction, mirroring `create`'s commit shape for an UPDATE instead
    /// of an INSERT so the `source_url` uniqueness invariant holds.
    pub async fn reclassify(
        &self,
        node_id: NodeId,
        draft: &NodeDraft,
        codes: NewNodeCodes,
        mutations: Vec<CodeMutation>,
        metadata_codes: Vec<MetadataCode>,
        reason: Option<String>,
    ) -> CurationResult<Node> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;
        let now = Utc::now();

        let row = sqlx::query_as::<_, NodeRow>("SELECT * FROM nodes WHERE id = ? AND is_deleted = 0")
            .bind(node_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(from_sqlx)?
            .ok_or_else(|| {
                curation_core::CurationError::new(
                    curation_core::ErrorKind::NodeNotFound,
                    format!("node {node_id} not found"),
                )
            })?;
        let mut node = row.into_node();

        let old_function_code = node.function_hierarchy_code.clone();
        let old_organization_code = node.organization_hierarchy_code.clone();

        node.title = draft.title.clone();
        node.source_domain = draft.source_domain.clone();
        node.company = draft.company.clone();
        node.extracted_fields = draft.extracted_fields.clone();
        node.segment_code = draft.classification.segment.to_string();
        node.category_code = draft.classification.category.clone();
        node.content_type_code = draft.classification.content_type.to_string();
        node.organization_code = draft.classification.organization.clone();
        node.function_hierarchy_code = codes.function_code;
        node.organization_hierarchy_code = codes.organization_code;
        node.updated_at = now;
        node.rebuild_descriptor();

        sqlx::query(
            r#"
            UPDATE nodes SET
                title = ?, source_domain = ?, company = ?, extracted_fields = ?,
                segment_code = ?, category_code = ?, content_type_code = ?, organization_code = ?,
                function_hierarchy_code = ?, organization_hierarchy_code = ?,
                descriptor = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&node.title)
        .bind(&node.source_domain)
        .bind(&node.company)
        .bind(node.extracted_fields.to_string())
        .bind(&node.segment_code)
        .bind(&node.category_code)
        .bind(&node.content_type_code)
        .bind(&node.organization_code)
        .bind(&node.function_hierarchy_code)
        .bind(&node.organization_hierarchy_code)
        .bind(&node.descriptor)
        .bind(node.updated_at.to_rfc3339())
        .bind(node.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        for (view, old_code, new_code) in [
            (HierarchyView::Function, old_function_code, node.function_hierarchy_code.clone()),
            (
                HierarchyView::Organization,
                old_organization_code,
                node.organization_hierarchy_code.clone(),
            ),
        ] {
            if old_code != new_code {
                insert_audit(
                    &mut tx,
                    node.id,
                    view,
                    Some(old_code),
                    Some(new_code),
                    ChangeType::Updated,
                    TriggeredBy::Import,
                    reason.clone(),
                    Vec::new(),
                )
                .await?;
            }
        }

        for m in &mutations {
            let column = match m.view {
                HierarchyView::Function => "function_hierarchy_code",
                HierarchyView::Organization => "organization_hierarchy_code",
            };
            let sql = format!(
                "UPDATE nodes SET {column} = ?, updated_at = ? WHERE id = ? AND is_deleted = 0"
            );
            sqlx::query(&sql)
                .bind(&m.new_code)
                .bind(now.to_rfc3339())
                .bind(m.node_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(from_sqlx)?;

            insert_audit(
                &mut tx,
                m.node_id,
                m.view,
                Some(m.old_code.clone()),
                Some(m.new_code.clone()),
                ChangeType::Restructured,
                TriggeredBy::Import,
                reason.clone(),
                vec![node.id],
            )
            .await?;

            if let Some(mirror) = fetch_for_fts(&mut tx, m.node_id).await? {
                crate::fts::upsert(&mut tx, &mirror).await?;
            }
        }

        crate::fts::upsert(&mut tx, &node).await?;
        tx.commit().await.map_err(from_sqlx)?;

        if !metadata_codes.is_empty() {
            self.set_metadata(node.id, &metadata_codes).await?;
        }

        Ok(node)
    }

    pub async fn get(&self, node_id: NodeId) -> CurationResult<Option<Node>> {
        let row = sqlx::query_as::<_, NodeRow>(
            "SELECT * FROM nodes WHERE id = ? AND is_deleted = 0",
        )
        .bind(node_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(row.map(NodeRow::into_node))
    }

    pub async fn get_by_source_url(&self, source_url: &str) -> CurationResult<Option<Node>> {
        let row = sqlx::query_as::<_, NodeRow>(
            "SELECT * FROM nodes WHERE source_url = ? AND is_deleted = 0",
        )
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(row.map(NodeRow::into_node))
    }

    pub async fn update(&self, node_id: NodeId, delta: NodeDelta) -> CurationResult<Node> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;
        let row = sqlx::query_as::<_, NodeRow>(
            "SELECT * FROM nodes WHERE id = ? AND is_deleted = 0",
        )
        .bind(node_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(from_sqlx)?
        .ok_or_else(|| {
            curation_core::CurationError::new(
                curation_core::ErrorKind::NodeNotFound,
                format!("node {node_id} not found"),
            )
        })?;
        let mut node = row.into_node();

        if let Some(t) = delta.title {
            node.title = t;
        }
        if let Some(c) = delta.company {
            node.company = Some(c);
        }
        if let Some(s) = delta.ai_summary {
            node.ai_summary = Some(s);
        }
        if let Some(p) = delta.phrase_description {
            node.phrase_description = Some(p);
        }
        if let Some(s) = delta.short_description {
            node.short_description = Some(s);
        }
        if let Some(k) = delta.key_concepts {
            node.key_concepts = k;
        }
        if let Some(l) = delta.logo_url {
            node.logo_url = Some(l);
        }
        if let Some(e) = delta.extracted_fields {
            node.extracted_fields = e;
        }
        node.updated_at = Utc::now();
        node.rebuild_descriptor();

        sqlx::query(
            r#"
            UPDATE nodes SET title=?, company=?, ai_summary=?, phrase_description=?,
                short_description=?, key_concepts=?, logo_url=?, extracted_fields=?,
                descriptor=?, updated_at=?
            WHERE id = ?
            "#,
        )
        .bind(&node.title)
        .bind(&node.company)
        .bind(&node.ai_summary)
        .bind(&node.phrase_description)
        .bind(&node.short_description)
        .bind(serde_json::to_string(&node.key_concepts).unwrap_or_default())
        .bind(&node.logo_url)
        .bind(node.extracted_fields.to_string())
        .bind(&node.descriptor)
        .bind(node.updated_at.to_rfc3339())
        .bind(node.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        crate::fts::upsert(&mut tx, &node).await?;
        insert_audit(
            &mut tx,
            node.id,
            HierarchyView::Function,
            None,
            None,
            ChangeType::Updated,
            TriggeredBy::Enrichment,
            None,
            Vec::new(),
        )
        .await?;
        tx.commit().await.map_err(from_sqlx)?;
        Ok(node)
    }

    /// Regenerate a node's hierarchy codes after enrichment reclassifies it.
    /// Used by the Phase-2 Enricher when classification changed; the caller
    /// supplies the already-planned mutations for both views.
    pub async fn apply_restructure(
        &self,
        new_codes: NewNodeCodes,
        node_id: NodeId,
        mutations: Vec<CodeMutation>,
    ) -> CurationResult<()> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;
        let now = Utc::now();

        sqlx::query(
            "UPDATE nodes SET function_hierarchy_code=?, organization_hierarchy_code=?, updated_at=? WHERE id = ?",
        )
        .bind(&new_codes.function_code)
        .bind(&new_codes.organization_code)
        .bind(now.to_rfc3339())
        .bind(node_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        for m in &mutations {
            let column = match m.view {
                HierarchyView::Function => "function_hierarchy_code",
                HierarchyView::Organization => "organization_hierarchy_code",
            };
            let sql = format!(
                "UPDATE nodes SET {column} = ?, updated_at = ? WHERE id = ? AND is_deleted = 0"
            );
            sqlx::query(&sql)
                .bind(&m.new_code)
                .bind(now.to_rfc3339())
                .bind(m.node_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(from_sqlx)?;

            insert_audit(
                &mut tx,
                m.node_id,
                m.view,
                Some(m.old_code.clone()),
                Some(m.new_code.clone()),
                ChangeType::Restructured,
                TriggeredBy::Enrichment,
                None,
                vec![node_id],
            )
            .await?;

            if let Some(mirror) = fetch_for_fts(&mut tx, m.node_id).await? {
                crate::fts::upsert(&mut tx, &mirror).await?;
            }
        }

        tx.commit().await.map_err(from_sqlx)?;
        Ok(())
    }

    pub async fn soft_delete(&self, node_id: NodeId) -> CurationResult<()> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE nodes SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(now.to_rfc3339())
        .bind(node_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(curation_core::CurationError::new(
                curation_core::ErrorKind::NodeNotFound,
                format!("node {node_id} not found"),
            ));
        }

        crate::fts::delete(&mut tx, node_id).await?;
        insert_audit(
            &mut tx,
            node_id,
            HierarchyView::Function,
            None,
            None,
            ChangeType::Deleted,
            TriggeredBy::UserMove,
            None,
            Vec::new(),
        )
        .await?;
        tx.commit().await.map_err(from_sqlx)?;
        Ok(())
    }

    /// Legacy unpaginated listing — all live rows, newest first.
    pub async fn list_all(&self, filter: &ListFilter) -> CurationResult<Vec<Node>> {
        let (where_clause, binds) = build_filter_clause(filter);
        let sql = format!(
            "SELECT * FROM nodes WHERE is_deleted = 0 {where_clause} ORDER BY date_added DESC"
        );
        let mut q = sqlx::query_as::<_, NodeRow>(&sql);
        for b in &binds {
            q = q.bind(b);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(from_sqlx)?;
        Ok(rows.into_iter().map(NodeRow::into_node).collect())
    }

    pub async fn list_paginated(
        &self,
        filter: &ListFilter,
        page: u32,
        limit: u32,
    ) -> CurationResult<PaginatedResult<Node>> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let (where_clause, binds) = build_filter_clause(filter);

        let count_sql = format!("SELECT COUNT(*) FROM nodes WHERE is_deleted = 0 {where_clause}");
        let mut cq = sqlx::query_scalar::<_, i64>(&count_sql);
        for b in &binds {
            cq = cq.bind(b);
        }
        let total: i64 = cq.fetch_one(&self.pool).await.map_err(from_sqlx)?;

        let sql = format!(
            "SELECT * FROM nodes WHERE is_deleted = 0 {where_clause} ORDER BY date_added DESC LIMIT ? OFFSET ?"
        );
        let mut q = sqlx::query_as::<_, NodeRow>(&sql);
        for b in &binds {
            q = q.bind(b);
        }
        q = q.bind(limit as i64).bind(((page - 1) * limit) as i64);
        let rows = q.fetch_all(&self.pool).await.map_err(from_sqlx)?;
        let data = rows.into_iter().map(NodeRow::into_node).collect();

        Ok(PaginatedResult {
            data,
            pagination: Pagination::new(page, limit, total as u64),
        })
    }

    /// All live nodes whose hierarchy code in `view` starts with `path_prefix`.
    pub async fn get_subtree(
        &self,
        view: HierarchyView,
        path_prefix: &str,
    ) -> CurationResult<Vec<Node>> {
        let column = match view {
            HierarchyView::Function => "function_hierarchy_code",
            HierarchyView::Organization => "organization_hierarchy_code",
        };
        let sql = format!(
            "SELECT * FROM nodes WHERE is_deleted = 0 AND ({column} = ? OR {column} LIKE ?) ORDER BY {column}"
        );
        let rows = sqlx::query_as::<_, NodeRow>(&sql)
            .bind(path_prefix)
            .bind(format!("{path_prefix}.%"))
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx)?;
        Ok(rows.into_iter().map(NodeRow::into_node).collect())
    }

    /// All live nodes, for hierarchy-tree/cache rebuilds.
    pub async fn get_all_live(&self) -> CurationResult<Vec<Node>> {
        let rows = sqlx::query_as::<_, NodeRow>("SELECT * FROM nodes WHERE is_deleted = 0")
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx)?;
        Ok(rows.into_iter().map(NodeRow::into_node).collect())
    }

    pub async fn get_node_by_hierarchy_code(
        &self,
        view: HierarchyView,
        code: &str,
    ) -> CurationResult<Option<Node>> {
        let column = match view {
            HierarchyView::Function => "function_hierarchy_code",
            HierarchyView::Organization => "organization_hierarchy_code",
        };
        let sql = format!("SELECT * FROM nodes WHERE is_deleted = 0 AND {column} = ?");
        let row = sqlx::query_as::<_, NodeRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;
        Ok(row.map(NodeRow::into_node))
    }

    /// Ancestor chain from the root segment/org down to (not including)
    /// `node_id` itself, by successively trimming one dotted component.
    pub async fn get_ancestry(
        &self,
        view: HierarchyView,
        node_id: NodeId,
    ) -> CurationResult<Vec<Node>> {
        let Some(node) = self.get(node_id).await? else {
            return Ok(Vec::new());
        };
        let code = node.hierarchy_code(view).to_string();
        let parts: Vec<&str> = code.split('.').collect();
        let mut ancestry = Vec::new();
        for i in 1..parts.len() {
            let prefix = parts[..i].join(".");
            if let Some(ancestor) = self.get_node_by_hierarchy_code(view, &prefix).await? {
                ancestry.push(ancestor);
            }
        }
        Ok(ancestry)
    }

    pub async fn get_audit_log(&self, node_id: NodeId) -> CurationResult<Vec<AuditEntry>> {
        crate::audit::for_node(&self.pool, node_id).await
    }
}

async fn fetch_for_fts(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    node_id: NodeId,
) -> CurationResult<Option<Node>> {
    let row = sqlx::query_as::<_, NodeRow>("SELECT * FROM nodes WHERE id = ?")
        .bind(node_id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(from_sqlx)?;
    Ok(row.map(NodeRow::into_node))
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn insert_audit(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    node_id: NodeId,
    view: HierarchyView,
    old_code: Option<String>,
    new_code: Option<String>,
    change_type: ChangeType,
    triggered_by: TriggeredBy,
    reason: Option<String>,
    related: Vec<NodeId>,
) -> CurationResult<()> {
    let related_json: Vec<String> = related.iter().map(ToString::to_string).collect();
    sqlx::query(
        r#"
        INSERT INTO hierarchy_audit_log
            (node_id, hierarchy_type, old_code, new_code, change_type, triggered_by, reason, related_node_ids, metadata, changed_at)
        VALUES (?,?,?,?,?,?,?,?,?,?)
        "#,
    )
    .bind(node_id.to_string())
    .bind(view.as_str())
    .bind(old_code)
    .bind(new_code)
    .bind(change_type.as_str())
    .bind(triggered_by.as_str())
    .bind(reason)
    .bind(serde_json::to_string(&related_json).unwrap_or_default())
    .bind("{}")
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await
    .map_err(from_sqlx)?;
    Ok(())
}

fn build_filter_clause(filter: &ListFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();
    if let Some(s) = &filter.segment {
        clauses.push("segment_code = ?".to_string());
        binds.push(s.clone());
    }
    if let Some(c) = &filter.category {
        clauses.push("category_code = ?".to_string());
        binds.push(c.clone());
    }
    if let Some(t) = &filter.content_type {
        clauses.push("content_type_code = ?".to_string());
        binds.push(t.clone());
    }
    if let Some(o) = &filter.organization {
        clauses.push("organization_code = ?".to_string());
        binds.push(o.clone());
    }
    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!("AND {}", clauses.join(" AND ")), binds)
    }
}
