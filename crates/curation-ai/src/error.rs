use curation_core::{CurationError, ErrorKind};

/// Map a failed LLM call onto the shared error taxonomy. `status` is the
/// HTTP status the provider returned, if the call got that far.
pub fn from_transport(err: &reqwest::Error) -> CurationError {
    if err.is_timeout() {
        return CurationError::new(ErrorKind::LlmTimeout, "LLM request timed out");
    }
    CurationError::new(ErrorKind::LlmUnavailable, err.to_string())
}

pub fn from_status(status: reqwest::StatusCode, body: &str) -> CurationError {
    let kind = match status.as_u16() {
        429 => ErrorKind::LlmRateLimited,
        401 | 403 => ErrorKind::LlmNotInitialized,
        408 | 504 => ErrorKind::LlmTimeout,
        _ => ErrorKind::LlmUnavailable,
    };
    CurationError::new(kind, format!("LLM provider returned {status}: {body}"))
}

pub fn parsing_error(message: impl Into<String>) -> CurationError {
    CurationError::new(ErrorKind::LlmParsingError, message.into())
}

pub fn invalid_response(message: impl Into<String>) -> CurationError {
    CurationError::new(ErrorKind::LlmInvalidResponse, message.into())
}
