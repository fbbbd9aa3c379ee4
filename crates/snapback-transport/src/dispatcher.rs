//! The handler seam both transports dispatch through (§2 data flow:
//! Transport → Session Registry → Auth Resolver → Tool Registry → ...).
//! The transport crate knows nothing about tools, auth or analysis — it
//! only knows how to hand a parsed request to a `RequestHandler` and write
//! back whatever comes out.

use async_trait::async_trait;
use snapback_protocol::{JsonRpcRequest, JsonRpcResponse};

/// Implemented by the gateway binary's wiring of Tool Registry + Auth
/// Resolver + Analysis Router etc. One call per JSON-RPC request; the
/// handler owns request validation, tier gating and response construction.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, session_id: &str, request: JsonRpcRequest) -> JsonRpcResponse;

    /// Called once when a session is registered, before any requests arrive.
    async fn on_session_open(&self, _session_id: &str) {}

    /// Called once when a session's transport closes; in-flight requests on
    /// that session must already have been cancelled by the caller (§4.2,
    /// §5) before this is invoked.
    async fn on_session_close(&self, _session_id: &str) {}
}
