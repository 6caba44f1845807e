//! Maps `CurationError` to the HTTP `{error, code, context?}` body the
//! whole API surface shares (§7), using the status/code the error kind
//! already carries so this mapping never duplicates that table.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use curation_core::CurationError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

pub struct ApiError(pub CurationError);

impl From<CurationError> for ApiError {
    fn from(e: CurationError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind;
        let status = StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let context = (!self.0.context.is_empty()).then(|| serde_json::json!(self.0.context));
        if status.is_server_error() {
            tracing::error!(code = kind.code(), message = %self.0.message, "request failed");
        } else {
            tracing::warn!(code = kind.code(), message = %self.0.message, "request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.message,
                code: kind.code(),
                context,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
