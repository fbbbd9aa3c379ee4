//! Framing & Transport (§4.1): the stream (newline-delimited JSON-RPC) and
//! HTTP+SSE adapters that both feed the same [`RequestHandler`]. Handlers
//! never touch the raw stream — the transport decouples them with a small
//! in-memory channel per session, generalized from the teacher's
//! request/response framing in its MCP client transport.

pub mod auth_gate;
pub mod dispatcher;
pub mod http;
pub mod rate_limit;
pub mod security;
pub mod stream;

pub use auth_gate::AuthGate;
pub use dispatcher::RequestHandler;
pub use rate_limit::RateLimiter;
pub use stream::StreamTransport;
