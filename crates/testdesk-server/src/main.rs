//! testdesk server binary
//!
//! ## Usage
//!
//! ```bash
//! # Serve the current directory on 127.0.0.1:5000
//! testdesk
//!
//! # Explicit workspace and port
//! testdesk --root ~/bench --port 8080
//!
//! # Config file with CLI overrides
//! testdesk --config bench.toml --allow-root Tests --allow-root src
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use testdesk_kernel::ExecutionRegistry;
use testdesk_server::{AppState, Cli, ServerConfig, SystemOpener, router};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("Server error: {:#}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    let config = ServerConfig::from_cli(cli)?;
    let state = AppState::new(&config.kernel, Arc::new(SystemOpener))
        .context("failed to open workspace")?;

    tracing::info!(
        root = %state.workspace.root().display(),
        allowed_roots = ?state.workspace.allowed_roots(),
        runner = %state.registry.runner().program,
        "workspace ready"
    );

    let addr = (config.server.bind.as_str(), config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}:{}", addr.0, addr.1))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    let registry = state.registry.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(registry))
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C, killing tracked runs so their requests can finish.
async fn shutdown_signal(registry: Arc<ExecutionRegistry>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutting down");
    for id in registry.active() {
        // Finished between listing and stopping; nothing to do.
        let _ = registry.stop(&id);
    }
}
