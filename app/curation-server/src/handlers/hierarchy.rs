//! `GET /api/hierarchy/:view`, `GET /api/hierarchy/subtree/:view/:path`,
//! `GET /api/hierarchy/path/:view/:nodeId`, `POST /api/hierarchy/invalidate`
//! (§4.5, §6). `:view` is `function` or `organization`; `:path` is a
//! dotted hierarchy code, percent-decoded by axum before it reaches us.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use curation_core::{CurationError, ErrorKind, HierarchyView, Node, NodeId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn parse_view(raw: &str) -> ApiResult<HierarchyView> {
    HierarchyView::from_str(raw).map_err(|_| {
        ApiError(CurationError::new(
            ErrorKind::InvalidInput,
            format!("unknown hierarchy view: {raw}"),
        ))
    })
}

pub async fn get_tree(
    State(state): State<AppState>,
    Path(view): Path<String>,
) -> ApiResult<Json<Arc<Vec<Node>>>> {
    let view = parse_view(&view)?;
    let tree = state.hierarchy.get_tree(view).await.map_err(ApiError)?;
    Ok(Json(tree))
}

pub async fn get_subtree(
    State(state): State<AppState>,
    Path((view, path)): Path<(String, String)>,
) -> ApiResult<Json<Arc<Vec<Node>>>> {
    let view = parse_view(&view)?;
    let subtree = state
        .hierarchy
        .get_subtree(view, &path)
        .await
        .map_err(ApiError)?;
    Ok(Json(subtree))
}

pub async fn get_ancestry(
    State(state): State<AppState>,
    Path((view, node_id)): Path<(String, NodeId)>,
) -> ApiResult<Json<Arc<Vec<Node>>>> {
    let view = parse_view(&view)?;
    let ancestry = state
        .hierarchy
        .get_ancestry(view, node_id)
        .await
        .map_err(ApiError)?;
    Ok(Json(ancestry))
}

/// Forces a coarse cache rebuild — an operator escape hatch for when a
/// direct schema edit or a restore has bypassed the normal mutation path
/// the cache invalidates on.
pub async fn invalidate(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    state.hierarchy.cache().invalidate_all();
    Ok(Json(serde_json::json!({ "invalidated": true })))
}
