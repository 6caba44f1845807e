use curation_core::{CurationError, ErrorKind};

/// Failure modes from fetching or parsing a URL (spec §4.2). `retryable()`
/// tells the caller whether the orchestrator should let the queue retry
/// the eventual Phase-2 job rather than failing the whole import.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("transient fetch failure: {0}")]
    TransientFetch(String),
    #[error("permanent fetch failure: {0}")]
    PermanentFetch(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("content exceeded {limit} bytes")]
    SizeExceeded { limit: u64 },
    #[error("upstream rate limited")]
    UpstreamRateLimited,
    #[error("request timed out")]
    Timeout,
}

impl ExtractError {
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ExtractError::TransientFetch(_) | ExtractError::UpstreamRateLimited | ExtractError::Timeout
        )
    }
}

impl From<ExtractError> for CurationError {
    fn from(e: ExtractError) -> Self {
        let kind = match &e {
            ExtractError::TransientFetch(_) | ExtractError::PermanentFetch(_) => ErrorKind::FetchFailed,
            ExtractError::Parse(_) => ErrorKind::ScrapeInvalidContent,
            ExtractError::SizeExceeded { .. } => ErrorKind::ContentTooLarge,
            ExtractError::UpstreamRateLimited => ErrorKind::RateLimitExceeded,
            ExtractError::Timeout => ErrorKind::Timeout,
        };
        CurationError::new(kind, e.to_string())
    }
}
