//! Identity Platform Login UI
//!
//! Bridges a browser session held by Ory Kratos with login and consent
//! challenges issued by Ory Hydra:
//! 1. Detects an existing Kratos session and accepts Hydra's login challenge
//! 2. Otherwise drives Kratos' browser login flow, forwarding its responses
//! 3. Accepts Hydra's consent challenge with scope-filtered identity claims
//! 4. Serves the static UI pages

mod claims;
mod config;
mod consent;
mod error;
mod login;
mod metrics;
mod passthrough;
mod session;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum_extra::extract::CookieJar;
use hydra::HydraClient;
use kratos::KratosClient;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::consent::ConsentQuery;
use crate::login::{CreateFlowQuery, IdQuery, UpdateFlowQuery};

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    kratos: KratosClient,
    hydra: HydraClient,
    base_url: Option<Arc<str>>,
    prometheus: PrometheusHandle,
}

/// Build the upstream HTTP client shared by both API clients.
///
/// Redirects are not followed: a 3xx from Kratos or Hydra is forwarded to
/// the browser like any other response.
fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
}

/// Build the axum router with all routes and shared state.
fn build_router(state: AppState, max_connections: usize, ui: Option<Router>) -> Router {
    let router = Router::new()
        .route(
            "/api/kratos/self-service/login/browser",
            get(create_flow_handler),
        )
        .route("/api/kratos/self-service/login/flows", get(get_flow_handler))
        .route("/api/kratos/self-service/login", post(update_flow_handler))
        .route("/api/kratos/self-service/errors", get(flow_error_handler))
        .route("/api/consent", get(consent_handler))
        .route("/health/alive", get(alive_handler))
        .route("/metrics", get(metrics_handler));

    let router = match ui {
        Some(ui) => router.fallback_service(ui),
        None => router,
    };

    router
        .layer(axum::middleware::from_fn(metrics::track))
        .layer(TraceLayer::new_for_http())
        // One semaphore shared by every route and the UI fallback
        .layer(tower::limit::GlobalConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting identity-platform-login-ui");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    match &config_path {
        Some(path) => info!(path = %path.display(), "loading configuration"),
        None => info!("no config file, using environment"),
    }

    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    info!(
        listen_addr = %config.server.listen_addr,
        kratos_public_url = %config.kratos.public_url,
        hydra_admin_url = %config.hydra.admin_url,
        base_url = config.server.base_url.as_deref().unwrap_or("<derived>"),
        ui_dir = ?config.server.ui_dir,
        "configuration loaded"
    );

    let http = build_http_client(config.server.timeout())
        .context("failed to build upstream HTTP client")?;

    let app_state = AppState {
        kratos: KratosClient::new(http.clone(), config.kratos.public_url.clone()),
        hydra: HydraClient::new(http, config.hydra.admin_url.clone()),
        base_url: config.server.base_url.as_deref().map(Arc::from),
        prometheus: prometheus_handle,
    };

    let ui = config.server.ui_dir.as_deref().map(ui::router);
    let app = build_router(app_state, config.server.max_connections, ui);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // Graceful shutdown: the drain timer starts when the signal fires, so
    // a slow client cannot hold the process past the grace period.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    let drain_timeout = config.server.drain_timeout();
    match tokio::time::timeout(drain_timeout, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = drain_timeout.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

/// Run an orchestrator inside a request span and map its error to a response.
async fn respond<F>(operation: &'static str, fut: F) -> Response
where
    F: std::future::Future<Output = error::Result<Response>>,
{
    let request_id = new_request_id();
    let span = info_span!("request", operation, request_id = %request_id);
    match fut.instrument(span).await {
        Ok(response) => response,
        Err(e) => e.into_response_for(&request_id),
    }
}

/// GET /api/kratos/self-service/login/browser
async fn create_flow_handler(
    State(state): State<AppState>,
    Query(query): Query<CreateFlowQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let base_url = login::base_url(state.base_url.as_deref(), &headers);
    respond(
        "create_flow",
        login::create_flow(&state.kratos, &state.hydra, &query, &jar, &base_url),
    )
    .await
}

/// GET /api/kratos/self-service/login/flows
async fn get_flow_handler(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    jar: CookieJar,
) -> Response {
    let id = query.id.unwrap_or_default();
    respond("get_flow", login::get_flow(&state.kratos, &id, &jar)).await
}

/// POST /api/kratos/self-service/login
async fn update_flow_handler(
    State(state): State<AppState>,
    Query(query): Query<UpdateFlowQuery>,
    jar: CookieJar,
    body: Bytes,
) -> Response {
    let flow = query.flow.unwrap_or_default();
    respond(
        "update_flow",
        login::update_flow(&state.kratos, &flow, &body, &jar),
    )
    .await
}

/// GET /api/kratos/self-service/errors
async fn flow_error_handler(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Response {
    let id = query.id.unwrap_or_default();
    respond("get_flow_error", login::get_flow_error(&state.kratos, &id)).await
}

/// GET /api/consent
async fn consent_handler(
    State(state): State<AppState>,
    Query(query): Query<ConsentQuery>,
    jar: CookieJar,
) -> Response {
    let challenge = query.consent_challenge.unwrap_or_default();
    respond(
        "accept_consent",
        consent::accept(&state.kratos, &state.hydra, &challenge, &jar),
    )
    .await
}

/// Liveness probe
async fn alive_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Prometheus metrics endpoint — returns metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
