use anyhow::Result;

/// Secrets and environment-specific values, loaded from the process
/// environment. Everything else — timeouts, concurrency caps, cache TTLs —
/// lives in the TOML `FileConfig` so it can be tuned without redeploying
/// secrets.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,

    /// LLM provider credential. The spec treats the LLM wire protocol as
    /// an external collaborator — only the key crosses the boundary.
    pub llm_api_key: String,
    pub llm_base_url: Option<String>,

    /// Opaque credentials passed through to content extractors that need
    /// an upstream API (never logged in the clear).
    pub firecrawl_api_key: Option<String>,
    pub apify_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://curation.db".to_string()),
            llm_api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))?,
            llm_base_url: std::env::var("LLM_BASE_URL").ok(),
            firecrawl_api_key: std::env::var("FIRECRAWL_API_KEY").ok(),
            apify_api_key: std::env::var("APIFY_API_KEY").ok(),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  LLM_API_KEY: {}", preview(&self.llm_api_key));
        tracing::info!("  FIRECRAWL_API_KEY: {}", preview_opt(&self.firecrawl_api_key));
        tracing::info!("  APIFY_API_KEY: {}", preview_opt(&self.apify_api_key));
        tracing::info!("  DATABASE_URL: {}", self.database_url);
    }
}
