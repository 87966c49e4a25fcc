//! Upstream response passthrough
//!
//! Forwards a buffered upstream response to the browser: headers first,
//! then status, then the raw body bytes. Hop-by-hop headers (RFC 2616
//! Section 13.5.1) describe the upstream connection, not the payload, and
//! are dropped; hyper frames the outbound body itself.

use axum::body::Body;
use axum::http::HeaderMap;
use axum::response::Response;
use upstream::UpstreamResponse;

/// Headers to strip when forwarding
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Turn an upstream response into the outbound response.
///
/// Every value of a repeated header is kept, so multiple `Set-Cookie`
/// lines from Kratos (CSRF plus session) all reach the browser.
pub fn forward(upstream: UpstreamResponse) -> Response {
    let UpstreamResponse {
        status,
        headers,
        body,
    } = upstream;

    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in &headers {
        if !is_hop_by_hop(name.as_str()) {
            forwarded.append(name.clone(), value.clone());
        }
    }

    let mut response = Response::new(Body::from(body));
    *response.headers_mut() = forwarded;
    *response.status_mut() = status;
    response
}

/// Check if a header is hop-by-hop
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}
