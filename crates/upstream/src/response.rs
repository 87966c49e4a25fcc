//! Buffered upstream response

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::UpstreamError;

/// An upstream response with its body fully read.
///
/// Kept whole (status, headers, raw bytes) so it can be forwarded to the
/// browser unchanged.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, operation: &'static str) -> crate::Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| UpstreamError::Decode {
            operation,
            message: e.to_string(),
        })
    }

    /// Body as text for log lines. Lossy on invalid UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
