use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use snapback_gateway::bootstrap::{build_app_state, spawn_background_tasks};
use snapback_gateway::cli::{load_config, Cli, Command, ConfigCommand};
use snapback_gateway::handler::Handler;
use snapback_transport::{http, StreamTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = load_config()?;
            let state = match build_app_state(config).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!(error = %e, "config validation failed");
                    std::process::exit(1);
                }
            };
            if let Err(e) = serve(state).await {
                tracing::error!(error = %e, "transport error");
                std::process::exit(2);
            }
            Ok(())
        }
        Some(Command::Doctor) => {
            let (config, _config_path) = load_config()?;
            let passed = snapback_gateway::doctor::run(&config).await;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, _config_path) = load_config()?;
            let production = !config.telemetry.is_development();
            let issues = config.validate(production);
            for issue in &issues {
                println!("{issue}");
            }
            if issues
                .iter()
                .any(|i| i.severity == snapback_domain::config::ConfigSeverity::Error)
            {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = load_config()?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Command::Version) => {
            println!("snapback {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize structured JSON tracing (only for the `serve` command).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,snapback_gateway=debug")),
        )
        .json()
        .init();
}

/// Serves either the stdio stream transport or the HTTP+SSE transport
/// depending on `SNAPBACK_TRANSPORT` (`stdio` | `http`, default `http`),
/// against already-built state (§6: config failures exit `1` before this
/// point, transport failures exit `2` from here on).
async fn serve(state: snapback_gateway::state::AppState) -> anyhow::Result<()> {
    spawn_background_tasks(&state);

    let server_config = state.config.server.clone();
    let sessions = state.sessions.clone();
    let development = !state.production;
    let handler = Arc::new(Handler { state });

    let transport_mode = std::env::var("SNAPBACK_TRANSPORT").unwrap_or_else(|_| "http".into());

    if transport_mode.eq_ignore_ascii_case("stdio") {
        tracing::info!("snapback listening on stdio");
        let transport = StreamTransport::new(handler, sessions);
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        transport
            .run(stdin, tokio::io::stdout())
            .await
            .context("stdio transport error")?;
        return Ok(());
    }

    let router = http::build_router(
        handler,
        sessions,
        &server_config,
        development,
        || true,
        "snapback",
        env!("CARGO_PKG_VERSION"),
    );

    let addr = format!("{}:{}", server_config.host, server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "snapback listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("axum server error")?;

    Ok(())
}
