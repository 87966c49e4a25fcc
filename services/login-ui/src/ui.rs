//! Static UI serving
//!
//! The UI is a statically exported site: `/login` is the file `login.html`.
//! Extensionless paths get the `.html` suffix before hitting the directory
//! service.

use std::path::Path;

use axum::Router;
use axum::extract::Request;
use axum::http::Uri;
use axum::middleware::map_request;
use tower_http::services::ServeDir;

/// Router serving `dist` with the `.html` rewrite applied.
pub fn router(dist: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(dist))
        .layer(map_request(rewrite_html))
}

async fn rewrite_html(mut request: Request) -> Request {
    if let Some(uri) = html_uri(request.uri()) {
        *request.uri_mut() = uri;
    }
    request
}

fn html_uri(uri: &Uri) -> Option<Uri> {
    let path = html_path(uri.path())?;
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}

/// `/login` → `/login.html`; `/`, directories and paths with an extension
/// are left alone.
pub fn html_path(path: &str) -> Option<String> {
    if path == "/" || path.ends_with('/') {
        return None;
    }
    let last = path.rsplit('/').next().unwrap_or(path);
    if last.contains('.') {
        return None;
    }
    Some(format!("{path}.html"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[test]
    fn html_suffix_rules() {
        assert_eq!(html_path("/login").as_deref(), Some("/login.html"));
        assert_eq!(html_path("/oidc/error").as_deref(), Some("/oidc/error.html"));
        assert_eq!(html_path("/"), None);
        assert_eq!(html_path("/_next/"), None);
        assert_eq!(html_path("/_next/static/chunks/main.js"), None);
        assert_eq!(html_path("/favicon.ico"), None);
    }

    #[test]
    fn rewrite_keeps_query() {
        let uri: Uri = "/login?login_challenge=abc".parse().unwrap();
        assert_eq!(
            html_uri(&uri).unwrap().to_string(),
            "/login.html?login_challenge=abc"
        );
    }

    #[tokio::test]
    async fn serves_html_page_for_extensionless_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("login.html"), "<h1>login</h1>").unwrap();

        let response = router(dir.path())
            .oneshot(
                axum::http::Request::builder()
                    .uri("/login?login_challenge=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<h1>login</h1>");
    }

    #[tokio::test]
    async fn missing_page_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(dir.path())
            .oneshot(
                axum::http::Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
