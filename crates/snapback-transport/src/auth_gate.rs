//! §4.1 credential-presence gate: every request to the `/mcp` routes must
//! carry `Authorization: Bearer <token>` or `X-API-Key: <token>`, or the
//! transport rejects it with 401 before the request ever reaches a
//! [`RequestHandler`]. Bypassed only in development mode. This is a
//! presence check, not a verification one — the credential's validity and
//! tier are resolved downstream, in-band, by the auth resolver that reads
//! it back out of the JSON-RPC request body.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderName, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

#[derive(Debug, Clone, Copy)]
pub struct AuthGate {
    pub development: bool,
}

fn has_credential_header(req: &Request<Body>) -> bool {
    let has_bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer "))
        .unwrap_or(false);
    has_bearer || req.headers().contains_key(API_KEY_HEADER)
}

pub async fn require_credential_header(
    State(gate): State<AuthGate>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if gate.development || has_credential_header(&req) {
        return next.run(req).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({
            "error": "missing Authorization bearer token or X-API-Key header",
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_header(name: &'static str, value: &str) -> Request<Body> {
        Request::builder()
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn bearer_header_satisfies_the_gate() {
        let req = request_with_header("authorization", "Bearer abc123");
        assert!(has_credential_header(&req));
    }

    #[test]
    fn x_api_key_header_satisfies_the_gate() {
        let req = request_with_header("x-api-key", "abc123");
        assert!(has_credential_header(&req));
    }

    #[test]
    fn missing_both_headers_fails_the_gate() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(!has_credential_header(&req));
    }

    #[test]
    fn non_bearer_authorization_scheme_fails_the_gate() {
        let req = request_with_header("authorization", "Basic abc123");
        assert!(!has_credential_header(&req));
    }
}
