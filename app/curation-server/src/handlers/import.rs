//! `POST /api/import`, `POST /api/batch-import`, `GET
//! /api/batch-import/:batchId`, `POST /api/batch-import/:batchId/cancel`
//! (§6, §[SUPPLEMENT] batch import).

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use curation_core::{BatchDetail, CurationError, ErrorKind};
use curation_orchestrator::{
    cancel_batch as orchestrator_cancel_batch, get_batch as orchestrator_get_batch,
    start_batch as orchestrator_start_batch, ImportOptions, ImportResult,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics::{IMPORTS_FAILED_TOTAL, IMPORTS_TOTAL};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub url: String,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default = "default_true")]
    pub create_queue_job: bool,
}

fn default_true() -> bool {
    true
}

pub async fn import(
    State(state): State<AppState>,
    Json(body): Json<ImportRequest>,
) -> ApiResult<Json<ImportResult>> {
    let options = ImportOptions {
        force_refresh: body.force_refresh,
        create_queue_job: body.create_queue_job,
    };

    match state.orchestrator.import(&body.url, options).await {
        Ok(result) => {
            metrics::counter!(IMPORTS_TOTAL).increment(1);
            Ok(Json(result))
        }
        Err(error) => {
            metrics::counter!(IMPORTS_FAILED_TOTAL).increment(1);
            Err(ApiError(error))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStartedResponse {
    pub batch_id: Uuid,
    pub item_count: usize,
    pub status: String,
}

pub async fn start_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchImportRequest>,
) -> ApiResult<Json<BatchStartedResponse>> {
    let orchestrator = state.orchestrator.clone();
    let item_count = body.urls.len();
    let batch_id = orchestrator_start_batch(orchestrator, body.urls)
        .await
        .map_err(ApiError)?;
    Ok(Json(BatchStartedResponse {
        batch_id,
        item_count,
        status: "processing".to_string(),
    }))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<BatchDetail>> {
    let detail = orchestrator_get_batch(&state.store, batch_id)
        .await
        .map_err(ApiError)?
        .ok_or_else(|| {
            ApiError(CurationError::new(
                ErrorKind::ResourceNotFound,
                format!("batch {batch_id} not found"),
            ))
        })?;
    Ok(Json(detail))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCancelledResponse {
    pub cancelled_items: u64,
}

pub async fn cancel_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<BatchCancelledResponse>> {
    let cancelled_items = orchestrator_cancel_batch(&state.store, batch_id)
        .await
        .map_err(ApiError)?;
    Ok(Json(BatchCancelledResponse { cancelled_items }))
}
