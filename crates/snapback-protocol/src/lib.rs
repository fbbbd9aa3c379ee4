//! `snapback-protocol` — JSON-RPC 2.0 / MCP wire types, the stdio/SSE
//! transport trait used to talk to external MCP servers, and the external
//! catalog manager the Tool Registry delegates to under a namespaced
//! prefix (§4.4).

pub mod config;
pub mod external;
pub mod protocol;
pub mod transport;

pub use config::{McpConfig, McpServerConfig, McpTransportKind};
pub use external::{McpError, McpManager};
pub use protocol::*;
