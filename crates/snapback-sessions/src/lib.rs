//! `snapback-sessions` — the Session Registry (§4.2) and per-session
//! cancellation (§5).

pub mod cancel;
pub mod registry;

pub use cancel::CancelToken;
pub use registry::{SessionHandle, SessionRegistry};
