use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// TOML-backed configuration loaded from disk. Secrets (API keys, DB URL)
/// stay as env vars in `AppConfig`; everything tunable lives here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub extraction: ExtractionConfig,
    pub classifier: ClassifierConfig,
    pub queue: QueueConfig,
    pub enrichment: EnrichmentConfig,
    pub rate_limits: RateLimitConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            extraction: ExtractionConfig::default(),
            classifier: ClassifierConfig::default(),
            queue: QueueConfig::default(),
            enrichment: EnrichmentConfig::default(),
            rate_limits: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub fetch_timeout_secs: u64,
    pub max_body_bytes: u64,
    pub per_host_concurrency: usize,
    pub global_fetch_concurrency: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            max_body_bytes: 10 * 1024 * 1024,
            per_host_concurrency: 4,
            global_fetch_concurrency: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model: String,
    pub cache_ttl_secs: u64,
    pub excerpt_max_chars: usize,
    pub reasoning_max_chars: usize,
    pub global_llm_concurrency: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            cache_ttl_secs: 3600,
            excerpt_max_chars: 1500,
            reasoning_max_chars: 200,
            global_llm_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub backoff_base_secs: u64,
    pub backoff_ceiling_secs: u64,
    pub visibility_timeout_secs: i64,
    pub default_max_attempts: i32,
    pub retention_secs: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backoff_base_secs: 1,
            backoff_ceiling_secs: 300,
            visibility_timeout_secs: 600,
            default_max_attempts: 5,
            retention_secs: 7 * 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub model: String,
    pub worker_pool_size: usize,
    pub poll_interval_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            worker_pool_size: 3,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub import_per_minute: u32,
    pub global_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            import_per_minute: 30,
            global_per_minute: 600,
        }
    }
}

/// Load and parse a TOML config file. Missing sections fall back to their
/// defaults, so a minimal `[server]\nport = 9000` file is valid on its own.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
