//! Route table (§6): every HTTP surface the backend exposes, wired onto
//! one `AppState`. Rate limiting is layered only onto the routes that can
//! push real work onto the backend from a single request; CORS and
//! request tracing wrap the whole router the way `rootsignal-server`
//! wraps its own Restate+Axum stack.

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{events, hierarchy, import, nodes, queue, search};
use crate::state::AppState;
use crate::{health, metrics, rate_limit};

pub fn build_router(state: AppState) -> Router {
    let import_routes = Router::new()
        .route("/api/import", post(import::import))
        .route("/api/batch-import", post(import::start_batch))
        .route("/api/batch-import/{batchId}", get(import::get_batch))
        .route(
            "/api/batch-import/{batchId}/cancel",
            post(import::cancel_batch),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::per_client_import_limit,
        ));

    let search_routes = Router::new()
        .route("/api/search", get(search::search))
        .route("/api/search/advanced", get(search::advanced_search))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::per_client_import_limit,
        ));

    let node_routes = Router::new()
        .route("/api/nodes", get(nodes::list))
        .route("/api/nodes/{id}", get(nodes::get))
        .route("/api/nodes/{id}", put(nodes::update))
        .route("/api/nodes/{id}", delete(nodes::delete));

    let hierarchy_routes = Router::new()
        .route("/api/hierarchy/{view}", get(hierarchy::get_tree))
        .route(
            "/api/hierarchy/subtree/{view}/{path}",
            get(hierarchy::get_subtree),
        )
        .route(
            "/api/hierarchy/path/{view}/{nodeId}",
            get(hierarchy::get_ancestry),
        )
        .route("/api/hierarchy/invalidate", post(hierarchy::invalidate));

    let queue_routes = Router::new()
        .route("/api/queue/status", get(queue::status))
        .route("/api/queue/jobs", get(queue::list_jobs))
        .route("/api/queue/jobs/{id}", get(queue::jobs_for_node))
        .route("/api/queue/jobs/{id}", delete(queue::cancel_job))
        .route("/api/queue/retry/{id}", post(queue::retry_job))
        .route("/api/queue/clear", post(queue::clear_completed));

    let event_routes = Router::new().route("/api/events", get(events::stream));

    let health_routes = Router::new()
        .route("/health", get(health::quick))
        .route("/health/full", get(health::full));

    let cors = cors_layer(&state);

    let app = Router::new()
        .merge(import_routes)
        .merge(search_routes)
        .merge(node_routes)
        .merge(hierarchy_routes)
        .merge(queue_routes)
        .merge(event_routes)
        .merge(health_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::global_limit,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let prom = metrics::install_recorder();
    app.merge(metrics::router(prom))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.file_config.server.allowed_origins;
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
