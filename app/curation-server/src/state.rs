//! Shared application state handed to every handler (§6). One `AppState`
//! is constructed at boot and cloned into axum's router — every field is
//! either an `Arc` or cheap to clone, mirroring how `rootsignal-server`
//! threads its `ServerDeps` through `with_state`.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::Mutex;

use curation_ai::LlmProvider;
use curation_core::FileConfig;
use curation_hierarchy::HierarchyEngine;
use curation_notify::NotificationBus;
use curation_orchestrator::ImportOrchestrator;
use curation_queue::Queue;
use curation_store::NodeStore;

pub type GlobalLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Keyed per-client token bucket for `/api/import` and friends. `governor`
/// keys by whatever hashable type the caller supplies — here the client's
/// IP (or, absent one, a constant bucket shared by everyone behind the
/// same proxy).
pub type KeyedLimiter = governor::RateLimiter<
    String,
    dashmap::DashMap<String, governor::state::InMemoryState>,
    DefaultClock,
>;

/// `/health/full`'s 30s single-flight cache (§[SUPPLEMENT] health checks) —
/// same memoize-and-share shape as the Hierarchy Cache, scaled down to one
/// entry since there is only ever one full-health snapshot.
pub struct HealthCache {
    pub ttl: Duration,
    pub last: Mutex<Option<(Instant, crate::health::FullHealthBody)>>,
}

pub struct AppState {
    pub store: Arc<NodeStore>,
    pub hierarchy: Arc<HierarchyEngine>,
    pub queue: Queue,
    pub orchestrator: Arc<ImportOrchestrator>,
    pub notifier: Arc<NotificationBus>,
    pub llm_provider: Arc<dyn LlmProvider>,
    pub file_config: Arc<FileConfig>,
    pub started_at: Instant,
    pub import_limiter: Arc<KeyedLimiter>,
    pub global_limiter: Arc<GlobalLimiter>,
    pub health_cache: Arc<HealthCache>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hierarchy: self.hierarchy.clone(),
            queue: self.queue.clone(),
            orchestrator: self.orchestrator.clone(),
            notifier: self.notifier.clone(),
            llm_provider: self.llm_provider.clone(),
            file_config: self.file_config.clone(),
            started_at: self.started_at,
            import_limiter: self.import_limiter.clone(),
            global_limiter: self.global_limiter.clone(),
            health_cache: self.health_cache.clone(),
        }
    }
}

impl AppState {
    pub fn new(
        store: Arc<NodeStore>,
        hierarchy: Arc<HierarchyEngine>,
        queue: Queue,
        orchestrator: Arc<ImportOrchestrator>,
        notifier: Arc<NotificationBus>,
        llm_provider: Arc<dyn LlmProvider>,
        file_config: Arc<FileConfig>,
    ) -> Self {
        let import_quota = Quota::per_minute(
            NonZeroU32::new(file_config.rate_limits.import_per_minute.max(1)).unwrap(),
        );
        let global_quota = Quota::per_minute(
            NonZeroU32::new(file_config.rate_limits.global_per_minute.max(1)).unwrap(),
        );

        Self {
            store,
            hierarchy,
            queue,
            orchestrator,
            notifier,
            llm_provider,
            file_config,
            started_at: Instant::now(),
            import_limiter: Arc::new(RateLimiter::keyed(import_quota)),
            global_limiter: Arc::new(RateLimiter::direct(global_quota)),
            health_cache: Arc::new(HealthCache {
                ttl: Duration::from_secs(30),
                last: Mutex::new(None),
            }),
        }
    }
}
