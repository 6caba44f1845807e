//! `GET /api/nodes`, `GET /api/nodes/:id`, `PUT /api/nodes/:id`, `DELETE
//! /api/nodes/:id` (§6). Listing supports both the legacy unpaginated shape
//! (no `page`/`limit` query params) and the paginated shape, distinguished
//! purely by which query params the caller supplies.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use curation_core::{CurationError, ErrorKind, Node, NodeDelta, NodeId};
use curation_store::{ListFilter, PaginatedResult};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNodesQuery {
    pub segment: Option<String>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub organization: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ListNodesResponse {
    Paginated(PaginatedResult<Node>),
    Legacy(Vec<Node>),
}

fn filter_from(q: &ListNodesQuery) -> ListFilter {
    ListFilter {
        segment: q.segment.clone(),
        category: q.category.clone(),
        content_type: q.content_type.clone(),
        organization: q.organization.clone(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListNodesQuery>,
) -> ApiResult<Json<ListNodesResponse>> {
    let filter = filter_from(&query);

    if query.page.is_none() && query.limit.is_none() {
        let nodes = state.store.list_all(&filter).await.map_err(ApiError)?;
        return Ok(Json(ListNodesResponse::Legacy(nodes)));
    }

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(20);
    let result = state
        .store
        .list_paginated(&filter, page, limit)
        .await
        .map_err(ApiError)?;
    Ok(Json(ListNodesResponse::Paginated(result)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(node_id): Path<NodeId>,
) -> ApiResult<Json<Node>> {
    let node = state
        .store
        .get(node_id)
        .await
        .map_err(ApiError)?
        .ok_or_else(|| {
            ApiError(CurationError::new(
                ErrorKind::NodeNotFound,
                format!("node {node_id} not found"),
            ))
        })?;
    Ok(Json(node))
}

pub async fn update(
    State(state): State<AppState>,
    Path(node_id): Path<NodeId>,
    Json(delta): Json<NodeDelta>,
) -> ApiResult<Json<Node>> {
    let node = state.store.update(node_id, delta).await.map_err(ApiError)?;
    Ok(Json(node))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(node_id): Path<NodeId>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.soft_delete(node_id).await.map_err(ApiError)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
