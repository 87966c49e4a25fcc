//! Service-specific error types
//!
//! Every fatal branch of a login or consent operation ends here and is
//! answered with an explicit status and a JSON error body, never with an
//! empty or hung response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use upstream::UpstreamError;

use crate::metrics;

#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication required")]
    AuthenticationRequired,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("failed to serialize {what}: {message}")]
    Serialization { what: &'static str, message: String },
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::Upstream(_) => "upstream_error",
            Self::Serialization { .. } => "internal_error",
        }
    }

    /// Build the client-facing response, tagged with the request id.
    pub fn into_response_for(self, request_id: &str) -> Response {
        if let Self::Upstream(e) = &self {
            metrics::record_upstream_error(e.operation());
        }
        error_response(self.status(), self.kind(), &self.to_string(), request_id)
    }
}

/// JSON error body: {"error":{"type":"...","message":"...","request_id":"req_..."}}
pub fn error_response(status: StatusCode, kind: &str, message: &str, request_id: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "type": kind,
            "message": message,
            "request_id": request_id,
        }
    });
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}
