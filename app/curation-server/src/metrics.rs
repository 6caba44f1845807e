//! Prometheus exposition for `/metrics` (§[SUPPLEMENT] metrics), installed
//! the same way `dekaf`'s metrics server does it: one global recorder, one
//! handle cloned into a tiny sub-router. Counters and gauges are recorded
//! from the handlers and background tasks that own the underlying event —
//! this module only renders what's already been recorded.
//!
//! Built as its own `Router<()>` (state = the `PrometheusHandle` alone) so
//! it can be `.merge()`d into the main app after that router has also been
//! reduced to `Router<()>` via `with_state`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const IMPORTS_TOTAL: &str = "curation_imports_total";
pub const IMPORTS_FAILED_TOTAL: &str = "curation_imports_failed_total";
pub const CLASSIFICATIONS_FALLBACK_TOTAL: &str = "curation_classifications_fallback_total";
pub const ENRICHMENT_JOBS_COMPLETE_TOTAL: &str = "curation_enrichment_jobs_complete_total";
pub const ENRICHMENT_JOBS_FAILED_TOTAL: &str = "curation_enrichment_jobs_failed_total";
pub const QUEUE_DEPTH_PENDING: &str = "curation_queue_depth_pending";
pub const QUEUE_DEPTH_PROCESSING: &str = "curation_queue_depth_processing";
pub const HTTP_REQUESTS_TOTAL: &str = "curation_http_requests_total";

pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder")
}

pub fn router(prom: PrometheusHandle) -> Router<()> {
    Router::new()
        .route("/metrics", get(render))
        .with_state(prom)
}

async fn render(State(prom_handle): State<PrometheusHandle>) -> (StatusCode, String) {
    (StatusCode::OK, prom_handle.render())
}
