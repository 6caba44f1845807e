//! `/health` and `/health/full` (§[SUPPLEMENT] health checks). The quick
//! check only proves the process is alive; the full check additionally
//! probes the database, the queue depth, and LLM reachability, and is
//! cached for 30s so a monitoring poller hitting it every few seconds
//! doesn't itself become a load source.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::time::Instant;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickHealthBody {
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullHealthBody {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub database: ComponentHealth,
    pub llm: ComponentHealth,
    pub queue_depth: i64,
    pub queue_processing: i64,
}

pub async fn quick(State(state): State<AppState>) -> Json<QuickHealthBody> {
    Json(QuickHealthBody {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// Computes a fresh snapshot only once per TTL window; concurrent callers
/// inside the window share the cached body rather than each re-probing the
/// database and the LLM.
pub async fn full(State(state): State<AppState>) -> Json<FullHealthBody> {
    let mut guard = state.health_cache.last.lock().await;
    if let Some((stamped_at, body)) = guard.as_ref() {
        if stamped_at.elapsed() < state.health_cache.ttl {
            return Json(body.clone());
        }
    }

    let body = probe(&state).await;
    *guard = Some((Instant::now(), body.clone()));
    Json(body)
}

async fn probe(state: &AppState) -> FullHealthBody {
    let database = match state.store.ping().await {
        Ok(()) => ComponentHealth { ok: true, detail: None },
        Err(e) => ComponentHealth {
            ok: false,
            detail: Some(e.message),
        },
    };

    let llm = match state
        .llm_provider
        .complete("ping", "reply with any short string")
        .await
    {
        Ok(_) => ComponentHealth { ok: true, detail: None },
        Err(e) => ComponentHealth {
            ok: false,
            detail: Some(e.message),
        },
    };

    let stats = state.queue.get_stats().await.unwrap_or_default();
    let status = if database.ok && llm.ok { "ok" } else { "degraded" };

    FullHealthBody {
        status,
        uptime_secs: state.started_at.elapsed().as_secs(),
        database,
        llm,
        queue_depth: stats.pending,
        queue_processing: stats.processing,
    }
}
