use std::sync::Arc;

use anyhow::Context;
use snapback_analysis::upstream::UpstreamClient;
use snapback_analysis::AnalysisRouter;
use snapback_auth::verifier::StaticTokenVerifier;
use snapback_auth::AuthResolver;
use snapback_docs::DocsClient;
use snapback_domain::config::{Config, ConfigSeverity};
use snapback_protocol::McpManager;
use snapback_sessions::SessionRegistry;
use snapback_snapshot::SnapshotStore;
use snapback_telemetry::TelemetrySink;
use snapback_tools::ToolRegistry;

use crate::cli::resolve_env_secret;
use crate::state::AppState;

/// Wires every subsystem from `config`, in the order each depends on the
/// last. Fails fast on any `Error`-severity config issue (§6 exit code 1).
pub async fn build_app_state(config: Config) -> anyhow::Result<AppState> {
    tracing::info!("snapback starting");

    let production = !config.telemetry.is_development();

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate(production);
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let config = Arc::new(config);

    // ── Session registry ─────────────────────────────────────────────
    let sessions = Arc::new(SessionRegistry::new());
    tracing::info!("session registry ready");

    // ── Auth (token read once, hashed at construction) ───────────────
    let api_token = resolve_env_secret(&config.server.api_token_env);
    let admin_token = resolve_env_secret(&config.server.admin_token_env);
    if api_token.is_none() && admin_token.is_none() {
        tracing::warn!(
            api_token_env = %config.server.api_token_env,
            admin_token_env = %config.server.admin_token_env,
            "bearer-token auth DISABLED — set the configured env vars to enable"
        );
    } else {
        tracing::info!("bearer-token auth enabled");
    }
    let verifier = Arc::new(StaticTokenVerifier::new(
        admin_token.as_deref(),
        api_token.as_deref(),
        !production,
    ));
    let auth = Arc::new(AuthResolver::new(verifier));
    tracing::info!("auth resolver ready");

    // ── Tool registry (no external MCP servers named by this surface) ─
    let tools = Arc::new(ToolRegistry::new(Arc::new(McpManager::empty())));
    tracing::info!(tools = tools.list().len(), "tool registry ready");

    // ── Analysis router ───────────────────────────────────────────────
    let upstream_api_key = resolve_env_secret(&config.upstream.api_key_env);
    if production {
        if let Some(key) = &upstream_api_key {
            if let Some(issue) =
                Config::validate_key_strictness(key, "upstream.api_key", production)
            {
                anyhow::bail!("{issue}");
            }
        }
    }
    let upstream = UpstreamClient::new(&config.upstream, upstream_api_key);
    tracing::info!(configured = upstream.is_some(), "upstream client ready");
    let analysis = Arc::new(AnalysisRouter::new(upstream));

    // ── Snapshot store ────────────────────────────────────────────────
    let snapshots = Arc::new(
        SnapshotStore::open(config.workspace.state_path())
            .context("opening snapshot store")?,
    );
    tracing::info!(snapshots = snapshots.list().len(), "snapshot store ready");

    // ── Documentation proxy (absent when unconfigured) ───────────────
    let docs_api_key = resolve_env_secret(&config.docs.api_key_env);
    let docs = DocsClient::new(&config.docs, docs_api_key).map(Arc::new);
    tracing::info!(configured = docs.is_some(), "documentation proxy ready");

    // ── Telemetry sink ────────────────────────────────────────────────
    let telemetry = TelemetrySink::spawn();
    tracing::info!("telemetry sink ready");

    Ok(AppState {
        config,
        sessions,
        auth,
        tools,
        analysis,
        snapshots,
        docs,
        telemetry,
        production,
    })
}

/// Spawns the gateway's periodic maintenance tasks. Each closes over only
/// the `Arc`s it needs.
pub fn spawn_background_tasks(state: &AppState) {
    if let Some(docs) = state.docs.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(3_600));
            loop {
                interval.tick().await;
                docs.cache().sweep_expired();
            }
        });
        tracing::info!("doc cache sweep scheduled (hourly)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_app_state_from_default_config_in_a_scratch_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.workspace.root = Some(dir.path().to_path_buf());

        let state = build_app_state(config).await.expect("default config must bootstrap cleanly");

        assert!(state.docs.is_none(), "docs is unconfigured by default");
        assert!(state.snapshots.list().is_empty());
        assert_eq!(state.tools.list().len(), 8);
    }

    #[tokio::test]
    async fn rejects_config_with_fatal_validation_errors() {
        let mut config = Config::default();
        // wildcard CORS is only a warning in development but fatal in production
        config.telemetry.mode = "production".into();
        config.server.cors.allowed_origins = vec!["*".into()];

        let result = build_app_state(config).await;

        assert!(result.is_err());
    }
}
