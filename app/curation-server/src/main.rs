mod error;
mod handlers;
mod health;
mod metrics;
mod rate_limit;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use curation_ai::{LlmProvider, OpenAiProvider};
use curation_classify::Classifier;
use curation_core::{AppConfig, FileConfig, UrlValidator};
use curation_enrich::EnrichmentWorker;
use curation_extract::{ExtractorRegistry, Fetcher};
use curation_hierarchy::HierarchyEngine;
use curation_notify::NotificationBus;
use curation_orchestrator::ImportOrchestrator;
use curation_queue::{Queue, QueueConfig, Reaper};
use curation_store::NodeStore;

use state::AppState;

#[derive(Parser)]
#[command(name = "curation-server", about = "URL curation backend")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "./config/curation.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("starting curation-server");

    let cli = Cli::parse();
    let file_config: FileConfig = if cli.config.exists() {
        curation_core::file_config::load_config(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        tracing::warn!(path = %cli.config.display(), "config file not found, using defaults");
        FileConfig::default()
    };
    let file_config = Arc::new(file_config);

    let app_config = AppConfig::from_env()?;

    let store = Arc::new(NodeStore::connect(&app_config.database_url).await?);
    let hierarchy = Arc::new(HierarchyEngine::new(store.clone()));

    let llm_provider: Arc<dyn LlmProvider> = match &app_config.llm_base_url {
        Some(base_url) => Arc::new(OpenAiProvider::with_base_url(
            app_config.llm_api_key.clone(),
            file_config.classifier.model.clone(),
            base_url.clone(),
        )),
        None => Arc::new(OpenAiProvider::new(
            app_config.llm_api_key.clone(),
            file_config.classifier.model.clone(),
        )),
    };

    let classifier = Arc::new(Classifier::new(
        llm_provider.clone(),
        Duration::from_secs(file_config.classifier.cache_ttl_secs),
    ));

    let registry = Arc::new(ExtractorRegistry::with_defaults());
    let fetcher = Arc::new(Fetcher::new(
        file_config.extraction.fetch_timeout_secs,
        file_config.extraction.max_body_bytes,
        file_config.extraction.per_host_concurrency,
        file_config.extraction.global_fetch_concurrency,
    ));

    let notifier = Arc::new(NotificationBus::new());

    let queue_config = QueueConfig {
        backoff_base_secs: file_config.queue.backoff_base_secs,
        backoff_ceiling_secs: file_config.queue.backoff_ceiling_secs,
        visibility_timeout_secs: file_config.queue.visibility_timeout_secs,
        default_max_attempts: file_config.queue.default_max_attempts,
    };
    let queue = Queue::new(store.pool().clone(), queue_config).with_notifier(notifier.clone());

    let validator = UrlValidator::new();

    let orchestrator = Arc::new(ImportOrchestrator::new(
        store.clone(),
        hierarchy.clone(),
        classifier,
        registry,
        fetcher,
        queue.clone(),
        validator,
        app_config.firecrawl_api_key.clone(),
        app_config.apify_api_key.clone(),
    ));

    let enrichment_provider: Arc<dyn LlmProvider> = match &app_config.llm_base_url {
        Some(base_url) => Arc::new(OpenAiProvider::with_base_url(
            app_config.llm_api_key.clone(),
            file_config.enrichment.model.clone(),
            base_url.clone(),
        )),
        None => Arc::new(OpenAiProvider::new(
            app_config.llm_api_key.clone(),
            file_config.enrichment.model.clone(),
        )),
    };

    for i in 0..file_config.enrichment.worker_pool_size {
        let worker = EnrichmentWorker::new(
            format!("enrichment-worker-{i}"),
            store.clone(),
            queue.clone(),
            hierarchy.clone(),
            enrichment_provider.clone(),
            notifier.clone(),
        );
        let poll_interval = Duration::from_millis(file_config.enrichment.poll_interval_ms);
        tokio::spawn(async move { worker.run(poll_interval).await });
    }

    let reaper = Reaper::new(
        queue.clone(),
        Duration::from_secs(file_config.queue.visibility_timeout_secs as u64),
    );
    tokio::spawn(async move { reaper.run().await });

    let state = AppState::new(
        store,
        hierarchy,
        queue,
        orchestrator,
        notifier,
        llm_provider,
        file_config.clone(),
    );

    let app = routes::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], file_config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
