//! `GET /api/queue/status`, `GET /api/queue/jobs`, `GET
//! /api/queue/jobs/:nodeId`, `POST /api/queue/retry/:jobId`, `DELETE
//! /api/queue/jobs/:jobId`, `POST /api/queue/clear` (§4.6, §6).

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use curation_core::{Job, JobPhase, JobStatus, NodeId};
use curation_queue::{JobFilter, QueueStats};
use curation_store::PaginatedResult;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn status(State(state): State<AppState>) -> ApiResult<Json<QueueStats>> {
    let stats = state.queue.get_stats().await.map_err(ApiError)?;
    Ok(Json(stats))
}

fn default_page() -> u32 {
    1
}
fn default_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
    pub phase: Option<JobPhase>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<PaginatedResult<Job>>> {
    let filter = JobFilter {
        status: query.status,
        phase: query.phase,
    };
    let result = state
        .queue
        .list_jobs(&filter, query.page, query.limit)
        .await
        .map_err(ApiError)?;
    Ok(Json(result))
}

#[derive(serde::Serialize)]
pub struct JobForNodeResponse {
    pub job: Option<Job>,
}

/// The node's most recent job — in practice there is at most one live row
/// per `(node, phase)` (§4.6), so "most recent" and "the live one" agree.
pub async fn jobs_for_node(
    State(state): State<AppState>,
    Path(node_id): Path<NodeId>,
) -> ApiResult<Json<JobForNodeResponse>> {
    let jobs = state.queue.get_jobs_for_node(node_id).await.map_err(ApiError)?;
    Ok(Json(JobForNodeResponse {
        job: jobs.into_iter().next(),
    }))
}

pub async fn retry_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    state.queue.retry(job_id).await.map_err(ApiError)?;
    Ok(Json(serde_json::json!({ "retried": true })))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    state.queue.cancel(job_id).await.map_err(ApiError)?;
    Ok(Json(serde_json::json!({ "cancelled": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCompletedRequest {
    /// Jobs completed before now minus this many seconds are purged;
    /// defaults to 0, i.e. every completed job.
    #[serde(default)]
    pub older_than_secs: i64,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedResponse {
    pub cleared: u64,
}

pub async fn clear_completed(
    State(state): State<AppState>,
    body: Option<Json<ClearCompletedRequest>>,
) -> ApiResult<Json<ClearedResponse>> {
    let older_than_secs = body.map(|b| b.older_than_secs).unwrap_or(0);
    let cutoff = Utc::now() - chrono::Duration::seconds(older_than_secs);
    let cleared = state.queue.clear_completed(cutoff).await.map_err(ApiError)?;
    Ok(Json(ClearedResponse { cleared }))
}
