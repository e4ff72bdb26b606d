// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Send one message through the bus from the command line.
//!
//! Useful against a PostgreSQL-backed deployment; with in-memory storage the
//! effect lasts only as long as the process.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use scribe_core::application::service_factory::ScribeServices;
use scribe_core::domain::config::ScribeConfigManifest;
use scribe_core::domain::message::Message;
use scribe_core::domain::tenant::TenantId;

#[derive(Args)]
pub struct DispatchCommand {
    /// Tenant the message runs under
    #[arg(long)]
    tenant: String,

    /// Message type, e.g. create_document or summary_saved
    #[arg(long = "type", value_name = "TYPE")]
    kind: String,

    /// JSON payload
    #[arg(long, default_value = "{}")]
    payload: String,
}

pub async fn execute(cmd: DispatchCommand, config: ScribeConfigManifest) -> Result<()> {
    let tenant = TenantId::new(&cmd.tenant).context("Invalid tenant")?;
    let payload: serde_json::Value =
        serde_json::from_str(&cmd.payload).context("Payload is not valid JSON")?;
    let message = Message::decode(&cmd.kind, payload)?;

    let services = ScribeServices::from_config(&config)
        .await
        .context("Failed to initialize services")?;

    let mut bus = services.message_bus(tenant);
    bus.handle(message).await?;

    println!("{}", format!("✓ {} handled", cmd.kind).green());
    for output in bus.results() {
        println!("{}", serde_json::to_string_pretty(output)?);
    }

    Ok(())
}
