//! Login flow orchestration
//!
//! Drives one login attempt:
//!
//! ```text
//! Start -> SessionChecked -> { DirectAccept | FlowCreated } -> FlowSubmitted -> { Accepted | Error }
//! ```
//!
//! A browser that already holds a valid Kratos session skips the flow
//! entirely: the Hydra login challenge is accepted for the session's
//! identity. Everything else is passed through to Kratos, with its response
//! forwarded to the browser unchanged.

use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use bytes::Bytes;
use hydra::{AcceptOAuth2LoginRequest, HydraClient};
use kratos::{BrowserLoginFlowParams, KratosClient, UpdateLoginFlowWithOidcMethod};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use upstream::{Classification, UpstreamError, UpstreamResponse};

use crate::error::Result;
use crate::passthrough;
use crate::session::{self, SessionCheck};

/// Kratos session cookie name
pub const SESSION_COOKIE: &str = "ory_kratos_session";

/// Path the browser returns to after Kratos completes a first-time login.
///
/// Kratos does not redirect to Hydra the first time a user logs in
/// (ory/kratos#3052), so the flow's return_to points back at the UI's login
/// page with the challenge, which then takes the direct-accept path.
pub const LOGIN_RETURN_PATH: &str = "/login?login_challenge=";

/// Query of `GET /api/kratos/self-service/login/browser`
#[derive(Debug, Default, Deserialize)]
pub struct CreateFlowQuery {
    pub login_challenge: Option<String>,
    pub aal: Option<String>,
    pub return_to: Option<String>,
    pub refresh: Option<String>,
}

/// Query of `GET /api/kratos/self-service/login/flows` and `/errors`
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// Query of `POST /api/kratos/self-service/login`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateFlowQuery {
    pub flow: Option<String>,
}

/// What `create_flow` does after the session check.
#[derive(Debug, PartialEq, Eq)]
enum CreateFlowStep {
    AcceptLogin { subject: String },
    CreateFlow,
}

/// A session check that errors is not fatal here: the browser still needs
/// a login flow.
fn next_step(check: std::result::Result<SessionCheck, UpstreamError>) -> CreateFlowStep {
    match check {
        Ok(SessionCheck::Authenticated(identity)) => CreateFlowStep::AcceptLogin {
            subject: identity.id,
        },
        Ok(SessionCheck::Unauthenticated) => CreateFlowStep::CreateFlow,
        Err(e) => {
            warn!(error = %e, "session check failed, creating a login flow instead");
            CreateFlowStep::CreateFlow
        }
    }
}

/// Create a browser login flow, or accept the login challenge directly when
/// the browser is already authenticated.
#[instrument(skip_all, fields(login_challenge = query.login_challenge.as_deref().unwrap_or_default()))]
pub async fn create_flow(
    kratos: &KratosClient,
    hydra: &HydraClient,
    query: &CreateFlowQuery,
    jar: &CookieJar,
    base_url: &str,
) -> Result<Response> {
    let cookie = cookie_header(jar);
    let login_challenge = query.login_challenge.as_deref().unwrap_or_default();

    let step = if jar.get(SESSION_COOKIE).is_some() {
        next_step(session::resolve(kratos, cookie.as_deref()).await)
    } else {
        CreateFlowStep::CreateFlow
    };

    if let CreateFlowStep::AcceptLogin { subject } = step {
        info!(subject, "session already authenticated, accepting login challenge");
        let accepted = hydra
            .accept_login_request(login_challenge, &AcceptOAuth2LoginRequest::new(subject))
            .await
            .inspect_err(|e| error!(error = %e, "accepting login challenge failed"))?;
        return Ok(passthrough::forward(accepted));
    }

    let params = BrowserLoginFlowParams {
        aal: query.aal.clone(),
        refresh: parse_bool(query.refresh.as_deref()),
        return_to: Some(return_to(base_url, login_challenge)),
        login_challenge: query.login_challenge.clone(),
    };
    let flow = kratos
        .create_browser_login_flow(&params, cookie.as_deref())
        .await
        .inspect_err(|e| error!(error = %e, "creating browser login flow failed"))?;
    Ok(passthrough::forward(flow))
}

/// Fetch a login flow. A 422 still carries a flow document and is forwarded.
#[instrument(skip_all, fields(flow_id = id))]
pub async fn get_flow(kratos: &KratosClient, id: &str, jar: &CookieJar) -> Result<Response> {
    let cookie = cookie_header(jar);
    let flow = allow_validation_failure(kratos.get_login_flow(id, cookie.as_deref()).await)?;
    Ok(passthrough::forward(flow))
}

/// Submit a login flow. An undecodable body is logged and submitted as an
/// empty OIDC submission so Kratos reports the validation problem.
#[instrument(skip_all, fields(flow_id = flow))]
pub async fn update_flow(
    kratos: &KratosClient,
    flow: &str,
    body: &Bytes,
    jar: &CookieJar,
) -> Result<Response> {
    let submission = decode_submission(body);
    let cookie = cookie_header(jar);
    let updated = allow_validation_failure(
        kratos
            .update_login_flow(flow, &submission, cookie.as_deref())
            .await,
    )?;
    Ok(passthrough::forward(updated))
}

/// Fetch the detail of a self-service flow error.
#[instrument(skip_all, fields(error_id = id))]
pub async fn get_flow_error(kratos: &KratosClient, id: &str) -> Result<Response> {
    let detail = kratos
        .get_flow_error(id)
        .await
        .inspect_err(|e| error!(error = %e, "fetching flow error failed"))?;
    Ok(passthrough::forward(detail))
}

/// Treat a 422 from Kratos as a forwardable response; anything else fails.
fn allow_validation_failure(
    result: std::result::Result<UpstreamResponse, UpstreamError>,
) -> Result<UpstreamResponse> {
    match result {
        Ok(response) => Ok(response),
        Err(e) if e.classification() == Some(Classification::ValidationFailure) => {
            info!(operation = e.operation(), "forwarding validation failure");
            e.into_response().map_err(Into::into)
        }
        Err(e) => {
            error!(error = %e, "identity provider call failed");
            Err(e.into())
        }
    }
}

fn decode_submission(body: &[u8]) -> UpdateLoginFlowWithOidcMethod {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        warn!(error = %e, "malformed login submission body, forwarding defaults");
        UpdateLoginFlowWithOidcMethod::default()
    })
}

/// Browser cookies re-serialized as a single `Cookie` header value.
pub fn cookie_header(jar: &CookieJar) -> Option<String> {
    let pairs: Vec<String> = jar
        .iter()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

/// Boolean query value. Absent or unparsable input is `false`.
///
/// Accepts the usual spellings: 1/t/T/TRUE/true/True and their false
/// counterparts.
pub fn parse_bool(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "t" | "T" | "TRUE" | "true" | "True"))
}

/// return_to for a new browser flow. Concatenated as-is: the challenge is
/// URL-safe and Kratos receives the whole value URL-encoded.
pub fn return_to(base_url: &str, login_challenge: &str) -> String {
    format!("{base_url}{LOGIN_RETURN_PATH}{login_challenge}")
}

/// Base URL of this service as seen by the browser: the configured override,
/// else scheme and host of the incoming request.
pub fn base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = configured.filter(|u| !u.is_empty()) {
        return url.to_string();
    }
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let scheme = header("x-forwarded-proto").unwrap_or("http");
    let host = header("x-forwarded-host")
        .or_else(|| headers.get(HOST).and_then(|v| v.to_str().ok()))
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use axum_extra::extract::cookie::Cookie;
    use kratos::Identity;

    #[test]
    fn parse_bool_defaults_to_false() {
        assert!(parse_bool(Some("true")));
        assert!(parse_bool(Some("1")));
        assert!(parse_bool(Some("T")));
        assert!(!parse_bool(Some("false")));
        assert!(!parse_bool(Some("yes")));
        assert!(!parse_bool(Some("")));
        assert!(!parse_bool(None));
    }

    #[test]
    fn return_to_embeds_challenge() {
        assert_eq!(
            return_to("https://login.example.com", "abc123"),
            "https://login.example.com/login?login_challenge=abc123"
        );
        assert_eq!(return_to("http://ui", ""), "http://ui/login?login_challenge=");
    }

    #[test]
    fn base_url_prefers_configured_value() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("internal:8080"));
        assert_eq!(
            base_url(Some("https://login.example.com"), &headers),
            "https://login.example.com"
        );
        assert_eq!(base_url(None, &headers), "http://internal:8080");
        assert_eq!(base_url(Some(""), &headers), "http://internal:8080");
    }

    #[test]
    fn base_url_honours_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("internal:8080"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("login.example.com"));
        assert_eq!(base_url(None, &headers), "https://login.example.com");
    }

    #[test]
    fn cookie_header_joins_pairs() {
        let jar = CookieJar::new()
            .add(Cookie::new(SESSION_COOKIE, "s1"))
            .add(Cookie::new("csrf_token", "c1"));
        let header = cookie_header(&jar).unwrap();
        let mut pairs: Vec<&str> = header.split("; ").collect();
        pairs.sort();
        assert_eq!(pairs, vec!["csrf_token=c1", "ory_kratos_session=s1"]);
        assert!(cookie_header(&CookieJar::new()).is_none());
    }

    #[test]
    fn next_step_accepts_authenticated_identity() {
        let identity = Identity {
            id: "u1".into(),
            schema_id: None,
            traits: serde_json::Value::Null,
        };
        assert_eq!(
            next_step(Ok(SessionCheck::Authenticated(identity))),
            CreateFlowStep::AcceptLogin {
                subject: "u1".into()
            }
        );
        assert_eq!(
            next_step(Ok(SessionCheck::Unauthenticated)),
            CreateFlowStep::CreateFlow
        );
    }

    #[test]
    fn next_step_falls_through_on_session_error() {
        let err = UpstreamError::Transport {
            operation: "FrontendApi.ToSession",
            message: "connection refused".into(),
            timeout: false,
        };
        assert_eq!(next_step(Err(err)), CreateFlowStep::CreateFlow);
    }

    #[test]
    fn malformed_submission_uses_defaults() {
        assert_eq!(
            decode_submission(b"{not json"),
            UpdateLoginFlowWithOidcMethod::default()
        );
        let decoded = decode_submission(br#"{"method":"oidc","provider":"google"}"#);
        assert_eq!(decoded.provider, "google");
    }

    #[test]
    fn validation_failure_is_forwardable() {
        let err = UpstreamError::Status {
            operation: "FrontendApi.GetLoginFlow",
            response: UpstreamResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                headers: HeaderMap::new(),
                body: Bytes::from_static(b"{\"id\":\"f1\"}"),
            },
        };
        let response = allow_validation_failure(Err(err)).unwrap();
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

        let gone = UpstreamError::Status {
            operation: "FrontendApi.GetLoginFlow",
            response: UpstreamResponse {
                status: StatusCode::GONE,
                headers: HeaderMap::new(),
                body: Bytes::new(),
            },
        };
        assert!(allow_validation_failure(Err(gone)).is_err());
    }
}
