use std::sync::Arc;

use snapback_analysis::AnalysisRouter;
use snapback_auth::AuthResolver;
use snapback_docs::DocsClient;
use snapback_domain::config::Config;
use snapback_sessions::SessionRegistry;
use snapback_snapshot::SnapshotStore;
use snapback_telemetry::TelemetrySink;
use snapback_tools::ToolRegistry;

/// Shared application state passed to the request handler.
///
/// Fields are grouped by concern:
/// - **Core** — config, session registry
/// - **Security** — auth resolver, tool registry (which owns the path
///   validator's workspace root indirectly via config)
/// - **Analysis** — the router, wrapping the upstream client and local
///   analyzer facade
/// - **Storage & docs** — snapshot store, documentation proxy (absent when
///   unconfigured)
/// - **Observability** — telemetry sink, production-mode flag (error
///   sanitizer verbosity, see §4.11)
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,

    pub auth: Arc<AuthResolver>,
    pub tools: Arc<ToolRegistry>,

    pub analysis: Arc<AnalysisRouter>,

    pub snapshots: Arc<SnapshotStore>,
    pub docs: Option<Arc<DocsClient>>,

    pub telemetry: TelemetrySink,
    pub production: bool,
}
