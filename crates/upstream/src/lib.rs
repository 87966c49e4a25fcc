//! Shared plumbing for calls to the identity provider and authorization server
//!
//! Both upstream clients go through [`execute`], which sends the request,
//! buffers the whole body and turns any non-2xx status into
//! [`UpstreamError::Status`]. The captured response rides along with the
//! error so callers that treat some statuses as expected (422 from a flow
//! update, 401 from a session check) can still inspect or forward it.

pub mod response;

pub use response::UpstreamResponse;

use reqwest::StatusCode;
use tracing::{debug, warn};

/// How the orchestrators should treat an upstream status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 2xx
    Success,
    /// 401 from the session check: a legitimate "no session" outcome
    Unauthorized,
    /// 422 from a flow fetch/update: body is still meaningful to the browser
    ValidationFailure,
    /// Anything else; fatal to the current operation
    Unexpected,
}

/// Classify an upstream status code.
pub fn classify(status: StatusCode) -> Classification {
    match status {
        s if s.is_success() => Classification::Success,
        StatusCode::UNAUTHORIZED => Classification::Unauthorized,
        StatusCode::UNPROCESSABLE_ENTITY => Classification::ValidationFailure,
        _ => Classification::Unexpected,
    }
}

/// Errors from upstream operations.
///
/// `operation` names the remote call (e.g. `FrontendApi.ToSession`) so every
/// log line can be traced back to the request that failed.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{operation}: request failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
        timeout: bool,
    },

    #[error("{operation}: failed to read response body: {message}")]
    Body {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: upstream returned {}", .response.status)]
    Status {
        operation: &'static str,
        response: UpstreamResponse,
    },

    #[error("{operation}: invalid response payload: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl UpstreamError {
    /// Name of the remote call that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Transport { operation, .. }
            | Self::Body { operation, .. }
            | Self::Status { operation, .. }
            | Self::Decode { operation, .. } => operation,
        }
    }

    /// Upstream status code, when the call got as far as a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { response, .. } => Some(response.status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { timeout: true, .. })
    }

    /// Classification of the upstream status, if there was one.
    pub fn classification(&self) -> Option<Classification> {
        self.status().map(classify)
    }

    /// Recover the upstream response carried by a status error. Errors
    /// without a response are handed back unchanged.
    pub fn into_response(self) -> std::result::Result<UpstreamResponse, Self> {
        match self {
            Self::Status { response, .. } => Ok(response),
            other => Err(other),
        }
    }
}

/// Statuses the orchestrators handle as ordinary outcomes: 401 from the
/// session check and 422 from a flow call.
fn is_expected_failure(status: StatusCode) -> bool {
    matches!(
        classify(status),
        Classification::Unauthorized | Classification::ValidationFailure
    )
}

/// Result alias for upstream operations.
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Send `request`, buffer the body, and fail on any non-2xx status.
///
/// No retries: a failed call is reported once and the operation ends.
pub async fn execute(
    operation: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<UpstreamResponse> {
    let response = request
        .send()
        .await
        .map_err(|e| UpstreamError::Transport {
            operation,
            message: e.to_string(),
            timeout: e.is_timeout(),
        })?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(|e| UpstreamError::Body {
        operation,
        message: e.to_string(),
    })?;

    let response = UpstreamResponse {
        status,
        headers,
        body,
    };

    if status.is_success() {
        debug!(operation, status = status.as_u16(), "upstream call succeeded");
        return Ok(response);
    }

    if is_expected_failure(status) {
        debug!(
            operation,
            status = status.as_u16(),
            "upstream returned expected non-success status"
        );
    } else {
        warn!(
            operation,
            status = status.as_u16(),
            body = %response.body_text(),
            "upstream returned non-success status"
        );
    }
    Err(UpstreamError::Status {
        operation,
        response,
    })
}
