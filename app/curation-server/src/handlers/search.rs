//! `GET /api/search` and `GET /api/search/advanced` (§4.4, §6). The basic
//! form is a keyword query with the four classification-code filters;
//! `advanced` additionally accepts a date range and the `hasMetadata`
//! confidence-gated filter.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use curation_store::SearchFilter;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn default_limit() -> u32 {
    20
}
fn default_page() -> u32 {
    1
}
fn default_confidence() -> f32 {
    0.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub segment: Option<String>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub organization: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSearchQuery {
    #[serde(default)]
    pub q: String,
    pub segment: Option<String>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub organization: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub has_metadata: Option<bool>,
    #[serde(default = "default_confidence")]
    pub confidence_threshold: f32,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<curation_store::SearchResult>> {
    let filter = SearchFilter {
        segment: query.segment,
        category: query.category,
        content_type: query.content_type,
        organization: query.organization,
        ..Default::default()
    };
    let result = state
        .store
        .keyword_search(&query.q, &filter, query.page, query.limit)
        .await
        .map_err(ApiError)?;
    Ok(Json(result))
}

pub async fn advanced_search(
    State(state): State<AppState>,
    Query(query): Query<AdvancedSearchQuery>,
) -> ApiResult<Json<curation_store::SearchResult>> {
    let filter = SearchFilter {
        segment: query.segment,
        category: query.category,
        content_type: query.content_type,
        organization: query.organization,
        date_from: query.date_from,
        date_to: query.date_to,
        has_metadata: query.has_metadata,
        confidence_threshold: query.confidence_threshold,
    };
    let result = state
        .store
        .keyword_search(&query.q, &filter, query.page, query.limit)
        .await
        .map_err(ApiError)?;
    Ok(Json(result))
}
