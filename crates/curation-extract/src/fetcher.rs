use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Semaphore;

use crate::error::ExtractError;
use crate::types::FetchedBody;

/// Fetches URLs under a per-host concurrency limit, a global concurrency
/// cap, a timeout, and a maximum body size. One instance is shared across
/// all extractors.
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: u64,
    per_host_limit: usize,
    per_host: DashMap<String, Arc<Semaphore>>,
    global: Arc<Semaphore>,
    user_agent: String,
}

impl Fetcher {
    pub fn new(timeout_secs: u64, max_body_bytes: u64, per_host_limit: usize, global_limit: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
            max_body_bytes,
            per_host_limit,
            per_host: DashMap::new(),
            global: Arc::new(Semaphore::new(global_limit)),
            user_agent: "CurationBot/1.0".to_string(),
        }
    }

    fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        self.per_host
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_limit)))
            .clone()
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedBody, ExtractError> {
        let parsed = url::Url::parse(url).map_err(|e| ExtractError::PermanentFetch(e.to_string()))?;
        let host = parsed.host_str().unwrap_or("").to_string();

        let _global_permit = self.global.acquire().await.map_err(|e| {
            ExtractError::TransientFetch(format!("global fetch semaphore closed: {e}"))
        })?;
        let host_sem = self.host_semaphore(&host);
        let _host_permit = host_sem.acquire_owned().await.map_err(|e| {
            ExtractError::TransientFetch(format!("host fetch semaphore closed: {e}"))
        })?;

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .get(url)
                .header("User-Agent", &self.user_agent)
                .send(),
        )
        .await
        .map_err(|_| ExtractError::Timeout)?
        .map_err(classify_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ExtractError::UpstreamRateLimited);
        }
        if status.is_client_error() {
            return Err(ExtractError::PermanentFetch(format!("HTTP {status}")));
        }
        if status.is_server_error() {
            return Err(ExtractError::TransientFetch(format!("HTTP {status}")));
        }

        let content_type_header = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let final_url = response.url().to_string();

        if let Some(len) = response.content_length() {
            if len > self.max_body_bytes {
                return Err(ExtractError::SizeExceeded {
                    limit: self.max_body_bytes,
                });
            }
        }

        let bytes = tokio::time::timeout(self.timeout, response.bytes())
            .await
            .map_err(|_| ExtractError::Timeout)?
            .map_err(classify_transport_error)?;

        if bytes.len() as u64 > self.max_body_bytes {
            return Err(ExtractError::SizeExceeded {
                limit: self.max_body_bytes,
            });
        }

        let html = String::from_utf8_lossy(&bytes).into_owned();
        Ok(FetchedBody {
            html,
            content_type_header,
            final_url,
        })
    }
}

fn classify_transport_error(e: reqwest::Error) -> ExtractError {
    if e.is_timeout() {
        ExtractError::Timeout
    } else if e.is_connect() {
        ExtractError::TransientFetch(e.to_string())
    } else {
        ExtractError::PermanentFetch(e.to_string())
    }
}

/// Snapshot of the fetcher's current per-host semaphore occupancy, mostly
/// useful for the `/metrics` surface.
pub fn permit_snapshot(fetcher: &Fetcher) -> HashMap<String, usize> {
    fetcher
        .per_host
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().available_permits()))
        .collect()
}
