//! HTTP+SSE transport (§4.1, §6): the pre-Streamable-HTTP MCP convention —
//! `GET /mcp` opens an SSE stream whose first event names the POST endpoint
//! for this session, `POST /mcp?sessionId=...` accepts one JSON-RPC request
//! per call and the actual response arrives over the SSE channel. Router
//! construction (CORS, concurrency limit, body limit, security headers,
//! rate limiting) mirrors the teacher's `run_server` layer stack generalized
//! to this crate's narrower surface.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::Stream;
use serde::Deserialize;
use snapback_domain::config::{CorsConfig, ServerConfig};
use snapback_protocol::{JsonRpcRequest, JsonRpcResponse};
use snapback_sessions::{CancelToken, SessionRegistry};
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::auth_gate::{require_credential_header, AuthGate};
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::security::security_headers;
use crate::RequestHandler;

/// Per-session outbound channel: the SSE stream's writer half. Registered
/// alongside the session id so `POST /mcp` can find where to push a
/// response once it's computed.
struct HttpSessions {
    registry: Arc<SessionRegistry>,
    outboxes: parking_lot::RwLock<std::collections::HashMap<String, mpsc::UnboundedSender<String>>>,
}

impl HttpSessions {
    fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            outboxes: parking_lot::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

#[derive(Clone)]
struct HttpState<H: RequestHandler + 'static> {
    handler: Arc<H>,
    sessions: Arc<HttpSessions>,
    health: Arc<dyn Fn() -> bool + Send + Sync>,
    version: &'static str,
    name: &'static str,
}

/// Builds the axum [`Router`] for the HTTP+SSE transport, fully layered
/// (CORS, concurrency limit, body size limit, security headers, the §4.1
/// credential-presence gate, rate limiting) and ready to pass to
/// `axum::serve`.
///
/// `health_check` is polled on `GET /health`; it should be cheap and
/// non-blocking (a lock-free liveness probe, not a deep dependency check).
/// `/health` and `/version` are never gated on a credential.
///
/// `development` bypasses the credential-presence gate (§4.1: `/mcp`
/// requests must otherwise carry `Authorization: Bearer ...` or
/// `X-API-Key: ...` or are rejected with 401).
///
/// Rate limiting keys on the caller's IP, so the returned router must be
/// served with `into_make_service_with_connect_info::<SocketAddr>()` rather
/// than `into_make_service()`.
pub fn build_router<H: RequestHandler + 'static>(
    handler: Arc<H>,
    sessions: Arc<SessionRegistry>,
    config: &ServerConfig,
    development: bool,
    health_check: impl Fn() -> bool + Send + Sync + 'static,
    name: &'static str,
    version: &'static str,
) -> Router {
    let state = HttpState {
        handler,
        sessions: Arc::new(HttpSessions::new(sessions)),
        health: Arc::new(health_check),
        version,
        name,
    };

    let mcp_routes = Router::new()
        .route("/mcp", get(mcp_sse).post(mcp_post))
        .layer(middleware::from_fn_with_state(
            AuthGate { development },
            require_credential_header,
        ))
        .layer(middleware::from_fn(security_headers));

    let mcp_routes = if let Some(rl) = &config.rate_limit {
        let limiter = Arc::new(RateLimiter::new(*rl));
        mcp_routes.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
    } else {
        mcp_routes
    };

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version_info))
        .merge(mcp_routes)
        .layer(axum::extract::DefaultBodyLimit::max(config.max_body_bytes as usize))
        .layer(tower::limit::ConcurrencyLimitLayer::new(256))
        .layer(build_cors_layer(&config.cors))
        .with_state(state)
}

async fn health<H: RequestHandler + 'static>(State(state): State<HttpState<H>>) -> Response {
    if (state.health)() {
        (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unavailable" })),
        )
            .into_response()
    }
}

async fn version_info<H: RequestHandler + 'static>(State(state): State<HttpState<H>>) -> Response {
    Json(serde_json::json!({ "name": state.name, "version": state.version })).into_response()
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// `GET /mcp`: registers a session and opens an SSE stream. The first event
/// is `"endpoint"`, naming the URL the client must `POST` requests to — the
/// pre-Streamable-HTTP MCP convention (§4.1).
async fn mcp_sse<H: RequestHandler + 'static>(
    State(state): State<HttpState<H>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = state.sessions.registry.register(CancelToken::new());
    state.handler.on_session_open(&session_id).await;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.sessions.outboxes.write().insert(session_id.clone(), tx);

    let endpoint = format!("/mcp?sessionId={session_id}");
    let sessions = state.sessions.clone();
    let handler = state.handler.clone();
    let session_id_for_stream = session_id.clone();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("endpoint").data(endpoint));

        loop {
            match rx.recv().await {
                Some(payload) => yield Ok(Event::default().event("message").data(payload)),
                None => break,
            }
        }

        sessions.outboxes.write().remove(&session_id_for_stream);
        sessions.registry.remove(&session_id_for_stream);
        handler.on_session_close(&session_id_for_stream).await;
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// `POST /mcp?sessionId=...`: accepts one JSON-RPC request and answers 202
/// immediately; the real response is delivered over the session's SSE
/// channel (§4.1). Unknown or expired session ids are rejected with 404
/// rather than silently dropped. The body's `Content-Type` must be
/// `application/json` (§4.1) or the request is rejected with 415.
async fn mcp_post<H: RequestHandler + 'static>(
    State(state): State<HttpState<H>>,
    Query(q): Query<SessionQuery>,
    request_headers: axum::http::HeaderMap,
    body: Bytes,
) -> Response {
    let is_json = request_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false);
    if !is_json {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(serde_json::json!({ "error": "Content-Type must be application/json" })),
        )
            .into_response();
    }

    let Some(session_id) = q.session_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "missing sessionId query parameter" })),
        )
            .into_response();
    };

    let Some(tx) = state.sessions.outboxes.read().get(&session_id).cloned() else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "unknown or expired session" })),
        )
            .into_response();
    };

    state.sessions.registry.touch(&session_id);

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            let resp = JsonRpcResponse::parse_error(&e.to_string());
            if let Ok(text) = serde_json::to_string(&resp) {
                let _ = tx.send(text);
            }
            return StatusCode::ACCEPTED.into_response();
        }
    };

    let handler = state.handler.clone();
    tokio::spawn(async move {
        let response = handler.handle(&session_id, request).await;
        if let Ok(text) = serde_json::to_string(&response) {
            let _ = tx.send(text);
        }
    });

    StatusCode::ACCEPTED.into_response()
}

/// CORS layer from `[server.cors]`. A wildcard-port origin such as
/// `http://localhost:*` expands into a predicate matching any numeric port
/// on that host; `"*"` alone allows everything (development only).
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_port_prefix_strips_star() {
        let cors = CorsConfig {
            allowed_origins: vec!["http://localhost:*".into()],
        };
        let layer = build_cors_layer(&cors);
        let _ = layer; // construction alone exercises the predicate builder
    }
}
