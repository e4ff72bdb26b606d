// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP server
//!
//! Builds the services from configuration and serves the document API until
//! Ctrl+C or SIGTERM. In-flight requests finish before the process exits.

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use scribe_core::application::service_factory::ScribeServices;
use scribe_core::domain::config::ScribeConfigManifest;
use scribe_core::presentation::api::app;

#[derive(Args)]
pub struct ServeCommand {
    /// Bind address (default: server.bind_address)
    #[arg(long, env = "SCRIBE_HOST")]
    host: Option<String>,

    /// HTTP port (default: server.port)
    #[arg(long, env = "SCRIBE_PORT")]
    port: Option<u16>,
}

pub async fn execute(cmd: ServeCommand, config: ScribeConfigManifest) -> Result<()> {
    config.validate().context("Configuration validation failed")?;

    let services = ScribeServices::from_config(&config)
        .await
        .context("Failed to initialize services")?;

    let host = cmd.host.unwrap_or_else(|| config.spec.server.bind_address.clone());
    let port = cmd.port.unwrap_or(config.spec.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        provider = %config.spec.llm.provider,
        "Scribe listening on {}", addr
    );

    axum::serve(listener, app(services))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Scribe shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
