// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Scribe CLI
//!
//! The `scribe` binary runs the document service and its operator tooling.
//!
//! ## Commands
//!
//! - `scribe serve` - Run the HTTP API
//! - `scribe migrate [--dry-run]` - Apply database migrations
//! - `scribe config show|validate|generate` - Configuration management
//! - `scribe dispatch --tenant T --type create_document --payload '{..}'` - Send one message through the bus

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use scribe_core::domain::config::ScribeConfigManifest;

mod commands;

use commands::{ConfigCommand, DispatchCommand, MigrateCommand, ServeCommand};

/// Scribe - tenant-scoped documents with streamed LLM summaries
#[derive(Parser)]
#[command(name = "scribe")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "SCRIBE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true, env = "SCRIBE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    #[command(name = "serve")]
    Serve {
        #[command(flatten)]
        command: ServeCommand,
    },

    /// Apply database migrations
    #[command(name = "migrate")]
    Migrate {
        #[command(flatten)]
        command: MigrateCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Send a single command or event through the message bus
    #[command(name = "dispatch")]
    Dispatch {
        #[command(flatten)]
        command: DispatchCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ScribeConfigManifest::load_or_default(cli.config.clone())
        .context("Failed to load configuration")?;

    let logging = &config.spec.observability.logging;
    init_logging(cli.log_level.as_deref().unwrap_or(&logging.level), &logging.format)?;
    info!(provider = %config.spec.llm.provider, "Configuration loaded");

    match cli.command {
        Some(Commands::Serve { command }) => commands::serve::execute(command, config).await,
        Some(Commands::Migrate { command }) => commands::migrate::execute(command, config).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config, config).await,
        Some(Commands::Dispatch { command }) => commands::dispatch::execute(command, config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
