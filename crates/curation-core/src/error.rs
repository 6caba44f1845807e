//! The error taxonomy shared by every component. Each kind carries an HTTP
//! status hint and a retryability flag so the queue and the HTTP layer both
//! make decisions from the same `CurationError` without re-deriving them.

use std::collections::HashMap;
use thiserror::Error;

/// Machine-readable error code. Stable across releases — clients match on
/// this, not on `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Validation
    UrlInvalid,
    UrlEmpty,
    UrlInvalidProtocol,
    SchemaValidationFailed,
    InvalidInput,
    // Authorization
    SsrfBlocked,
    Unauthorized,
    Forbidden,
    // Not found
    NodeNotFound,
    ResourceNotFound,
    // Conflict
    DuplicateEntry,
    DatabaseConstraintViolation,
    // Rate / throttle
    RateLimitExceeded,
    // External fetch
    FetchFailed,
    Timeout,
    ContentTooLarge,
    ScrapeFailed,
    ScrapeInvalidContent,
    // LLM
    LlmUnavailable,
    LlmTimeout,
    LlmRateLimited,
    LlmInvalidResponse,
    LlmParsingError,
    LlmNotInitialized,
    // Store
    DatabaseConnectionError,
    DatabaseQueryError,
    DatabaseTransactionError,
    // Internal
    ConfigurationError,
    NotImplemented,
    InternalError,
}

impl ErrorKind {
    /// HTTP status hint used by the server's error-to-response mapping.
    pub fn http_status(self) -> u16 {
        use ErrorKind::*;
        match self {
            UrlInvalid | UrlEmpty | UrlInvalidProtocol | SchemaValidationFailed | InvalidInput => {
                400
            }
            SsrfBlocked | Forbidden => 403,
            Unauthorized => 401,
            NodeNotFound | ResourceNotFound => 404,
            DuplicateEntry | DatabaseConstraintViolation => 409,
            RateLimitExceeded => 429,
            Timeout => 408,
            FetchFailed | ScrapeFailed | ScrapeInvalidContent | ContentTooLarge => 502,
            LlmUnavailable | LlmTimeout | LlmRateLimited | LlmInvalidResponse | LlmParsingError
            | LlmNotInitialized => 503,
            DatabaseConnectionError | DatabaseQueryError | DatabaseTransactionError => 500,
            ConfigurationError | NotImplemented | InternalError => 500,
        }
    }

    /// Whether the processing queue should retry a job that failed with this kind.
    pub fn retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::LlmTimeout
                | ErrorKind::LlmRateLimited
                | ErrorKind::FetchFailed
                | ErrorKind::Timeout
                | ErrorKind::DatabaseConnectionError
                | ErrorKind::RateLimitExceeded
        )
    }

    /// Machine code string used in HTTP `{error, code, context?}` bodies.
    pub fn code(self) -> &'static str {
        use ErrorKind::*;
        match self {
            UrlInvalid => "URL_INVALID",
            UrlEmpty => "URL_EMPTY",
            UrlInvalidProtocol => "URL_INVALID_PROTOCOL",
            SchemaValidationFailed => "SCHEMA_VALIDATION_FAILED",
            InvalidInput => "INVALID_INPUT",
            SsrfBlocked => "SSRF_BLOCKED",
            Unauthorized => "UNAUTHORIZED",
            Forbidden => "FORBIDDEN",
            NodeNotFound => "NODE_NOT_FOUND",
            ResourceNotFound => "RESOURCE_NOT_FOUND",
            DuplicateEntry => "DUPLICATE_ENTRY",
            DatabaseConstraintViolation => "DATABASE_CONSTRAINT_VIOLATION",
            RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            FetchFailed => "FETCH_FAILED",
            Timeout => "TIMEOUT",
            ContentTooLarge => "CONTENT_TOO_LARGE",
            ScrapeFailed => "SCRAPE_FAILED",
            ScrapeInvalidContent => "SCRAPE_INVALID_CONTENT",
            LlmUnavailable => "LLM_UNAVAILABLE",
            LlmTimeout => "LLM_TIMEOUT",
            LlmRateLimited => "LLM_RATE_LIMITED",
            LlmInvalidResponse => "LLM_INVALID_RESPONSE",
            LlmParsingError => "LLM_PARSING_ERROR",
            LlmNotInitialized => "LLM_NOT_INITIALIZED",
            DatabaseConnectionError => "DATABASE_CONNECTION_ERROR",
            DatabaseQueryError => "DATABASE_QUERY_ERROR",
            DatabaseTransactionError => "DATABASE_TRANSACTION_ERROR",
            ConfigurationError => "CONFIGURATION_ERROR",
            NotImplemented => "NOT_IMPLEMENTED",
            InternalError => "INTERNAL_ERROR",
        }
    }
}

/// The error type propagated across component boundaries. Carries a
/// machine code, an HTTP-status hint (via `kind`), a human message, and an
/// optional context bag — every log site and audit site must pass context
/// values through [`redact`](crate::types::redact) before attaching secrets.
#[derive(Debug, Error)]
#[error("{}: {message}", kind.code())]
pub struct CurationError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: HashMap<String, String>,
}

impl CurationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: HashMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn retryable(&self) -> bool {
        self.kind.retryable()
    }
}

/// Security-related errors, raised by [`crate::security::UrlValidator`].
/// Kept as a distinct leaf type rather than folded into `CurationError`
/// directly, since extractors validate URLs before they have a
/// `CurationError`-aware context to attach.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("URL is empty")]
    EmptyUrl,
    #[error("malformed URL: {0}")]
    MalformedUrl(String),
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),
    #[error("credentials present in URL")]
    CredentialsInUrl,
    #[error("private or internal address: {0}")]
    PrivateAddress(String),
    #[error("blocked port: {0}")]
    BlockedPort(u16),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl SecurityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SecurityError::EmptyUrl => ErrorKind::UrlEmpty,
            SecurityError::MalformedUrl(_) | SecurityError::UrlParse(_) => ErrorKind::UrlInvalid,
            SecurityError::DisallowedScheme(_) => ErrorKind::UrlInvalidProtocol,
            SecurityError::CredentialsInUrl => ErrorKind::UrlInvalid,
            SecurityError::PrivateAddress(_) | SecurityError::BlockedPort(_) => {
                ErrorKind::SsrfBlocked
            }
        }
    }
}

impl From<SecurityError> for CurationError {
    fn from(e: SecurityError) -> Self {
        let kind = e.kind();
        CurationError::new(kind, e.to_string())
    }
}

pub type CurationResult<T> = std::result::Result<T, CurationError>;
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
