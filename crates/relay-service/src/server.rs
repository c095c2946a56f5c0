//! Axum HTTP server: router, listener, graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use opentelemetry::Context;
use relay_tracing::Tracer;
use tracing::Instrument;
use url::Url;

use crate::config::RelayConfig;
use crate::relay::behavior::BehaviorQuery;
use crate::relay::error::RelayError;
use crate::relay::request_id;
use crate::relay::upstream::{Outbound, UpstreamClient};
use crate::workload;

/// Shared application state. Read-only once the server starts.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub tracer: Tracer,
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Build the outbound client from config and wire in the tracer handle.
    pub fn new(config: RelayConfig, tracer: Tracer) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .build()?;

        Ok(Self {
            upstream: UpstreamClient::new(client, tracer.clone()),
            tracer,
            config,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/info", get(handle_info).post(handle_info))
        .route(
            "/correlation",
            get(handle_correlation).post(handle_correlation),
        )
        .route("/error", get(handle_error).post(handle_error))
        .route("/notfound", get(handle_not_found).post(handle_not_found))
        .route("/echo", get(handle_echo).post(handle_echo))
        .route("/profile", get(handle_profile).post(handle_profile))
        .route("/ignored", get(handle_ignored))
        .route("/health", get(handle_health))
        .fallback(handle_fallback)
        .with_state(Arc::new(state))
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.server.listen_address.clone();
    let service = state.tracer.service_name().to_string();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, service = %service, "Relay service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Relay service shut down gracefully");
    Ok(())
}

/// Open the server span for an inbound request, parented on the caller's
/// trace context.
fn entry(
    state: &AppState,
    operation: &str,
    method: &Method,
    headers: &HeaderMap,
) -> (tracing::Span, Context, String) {
    let request_id = request_id::generate_id();
    let span = relay_tracing::entry_span!(operation, method, request_id);
    let cx = state.tracer.extract(headers);
    state.tracer.attach(&span, &cx);
    (span, cx, request_id)
}

/// Record the final status on the current entry span.
fn respond(response: Response) -> Response {
    tracing::Span::current().record("status", response.status().as_u16());
    response
}

/// GET|POST /info: plain relay.
async fn handle_info(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = BehaviorQuery::from_pairs(pairs);
    relay(&state, "/info", false, query, method, headers, body).await
}

/// GET|POST /correlation: relay with the configured correlation entry.
async fn handle_correlation(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = BehaviorQuery::from_pairs(pairs);
    relay(&state, "/correlation", true, query, method, headers, body).await
}

/// The relay itself.
///
/// 1. Delay
/// 2. Optionally add the correlation entry
/// 3. Resolve the target from the query
/// 4. Call the target and relay its status and body verbatim
/// 5. Call extra peers; their results never change the response
///
/// Local failures become a fixed 500 and stop the relay.
async fn relay(
    state: &AppState,
    operation: &'static str,
    correlate: bool,
    query: BehaviorQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (span, cx, request_id) = entry(state, operation, &method, &headers);

    async move {
        workload::delay(state.config.relay.delay_ms).await;

        let cx = if correlate {
            let correlation = &state.config.correlation;
            state
                .tracer
                .with_correlation(&cx, &correlation.key, &correlation.value)
        } else {
            cx
        };

        let behavior = query.behavior();
        let target = match behavior.target(&state.config.upstream.url) {
            Ok(url) => url,
            Err(e) => {
                let err = RelayError::from(e);
                tracing::error!(
                    error = %err,
                    upstream = %state.config.upstream.url,
                    "Cannot resolve relay target"
                );
                return respond(err.into_response());
            }
        };
        tracing::debug!(behavior = behavior.as_str(), target = %target, "Relaying request");

        let outbound = Outbound {
            operation,
            method,
            url: target,
            content_type: headers.get(CONTENT_TYPE).cloned(),
            body,
            request_id: &request_id,
        };

        let answer = match state.upstream.call(outbound.clone(), &cx).await {
            Ok(answer) => answer,
            Err(e) => return respond(e.into_response()),
        };

        for peer in &state.config.upstream.peers {
            let url = match Url::parse(peer) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(error = %e, peer = %peer, "Skipping invalid peer URL");
                    continue;
                }
            };
            let peer_call = Outbound {
                url,
                ..outbound.clone()
            };
            if state.upstream.call(peer_call, &cx).await.is_err() {
                tracing::debug!(peer = %peer, "Peer failure ignored");
            }
        }

        respond(answer.into_response())
    }
    .instrument(span)
    .await
}

/// GET|POST /error: simulated server error.
async fn handle_error(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let (span, _, _) = entry(&state, "/error", &method, &headers);
    span.in_scope(|| {
        tracing::warn!("Simulated error requested");
        respond((StatusCode::INTERNAL_SERVER_ERROR, "simulated error").into_response())
    })
}

/// GET|POST /notfound: simulated missing resource.
async fn handle_not_found(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let (span, _, _) = entry(&state, "/notfound", &method, &headers);
    span.in_scope(|| respond((StatusCode::NOT_FOUND, "not found").into_response()))
}

/// GET|POST /echo: render `<inbound correlation value>_<own value>`.
async fn handle_echo(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let (span, cx, _) = entry(&state, "/echo", &method, &headers);
    span.in_scope(|| {
        let correlation = &state.config.correlation;
        let inbound = state
            .tracer
            .correlation(&cx, &correlation.key)
            .unwrap_or_else(|| "none".to_string());
        respond((StatusCode::OK, format!("{inbound}_{}", correlation.value)).into_response())
    })
}

/// GET|POST /profile: burn CPU so a profiler has something to sample.
async fn handle_profile(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let (span, _, _) = entry(&state, "/profile", &method, &headers);

    async move {
        let duration_ms = state.config.profile.duration_ms;
        match workload::burn_cpu(Duration::from_millis(duration_ms)).await {
            Ok(rounds) => {
                tracing::info!(duration_ms, rounds, "CPU burn complete");
                respond((StatusCode::OK, "profiled").into_response())
            }
            Err(e) => {
                tracing::error!(error = %e, "CPU burn task failed");
                respond((StatusCode::INTERNAL_SERVER_ERROR, "relay error").into_response())
            }
        }
    }
    .instrument(span)
    .await
}

/// GET /ignored: static body, deliberately untraced.
async fn handle_ignored() -> impl IntoResponse {
    tracing::debug!("Ignored endpoint hit");
    (StatusCode::OK, "ignored")
}

/// Health check endpoint.
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn handle_fallback(method: Method, uri: axum::http::Uri) -> impl IntoResponse {
    tracing::debug!(method = %method, path = %uri.path(), "No route");
    (StatusCode::NOT_FOUND, "not found")
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = first_signal(ctrl_c, terminate).await;
    tracing::info!(signal, "Shutdown signal received, draining connections...");
}

/// Resolve with the name of whichever stop signal arrives first.
async fn first_signal(
    interrupt: impl std::future::Future<Output = ()>,
    terminate: impl std::future::Future<Output = ()>,
) -> &'static str {
    tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
