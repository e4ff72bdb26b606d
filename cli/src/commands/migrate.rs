// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Database Migrate Command
//!
//! Applies the schema under `cli/migrations` to the configured PostgreSQL
//! database.
//!
//! # Usage
//!
//! ```bash
//! # Apply all pending migrations
//! scribe migrate
//!
//! # Preview migrations without applying
//! scribe migrate --dry-run
//! ```
//!
//! The database URL comes from `spec.database.url` (or `DATABASE_URL`).

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use scribe_core::domain::config::ScribeConfigManifest;
use scribe_core::infrastructure::db::Database;

#[derive(Args)]
pub struct MigrateCommand {
    /// List pending migrations without applying them
    #[arg(long)]
    dry_run: bool,
}

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn execute(cmd: MigrateCommand, config: ScribeConfigManifest) -> Result<()> {
    println!("{}", "Scribe Migrate".bold().green());

    let database = Database::from_config(&config.spec.database)
        .await?
        .context("No database configured. Set spec.database.url or DATABASE_URL.")?;
    let pool = database.get_pool();

    let applied_count = sqlx::query("SELECT version FROM _sqlx_migrations")
        .fetch_all(pool)
        .await
        .map(|rows| rows.len())
        .unwrap_or(0);
    let total_migrations = MIGRATOR.iter().count();

    println!(
        "Migration status: {} applied, {} total available.",
        applied_count, total_migrations
    );

    if applied_count >= total_migrations {
        println!("{}", "✓ Database is up to date.".green());
        return Ok(());
    }

    if cmd.dry_run {
        println!("Pending migrations (dry run):");
        for migration in MIGRATOR.iter().skip(applied_count) {
            println!(" - {} {}", migration.version, migration.description);
        }
        return Ok(());
    }

    println!("Applying pending migrations...");
    MIGRATOR.run(pool).await.context("Failed to apply migrations")?;
    println!("{}", "✓ Database updated successfully.".green());

    Ok(())
}
