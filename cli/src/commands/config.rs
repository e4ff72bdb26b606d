// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use scribe_core::domain::config::ScribeConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./scribe-config.yaml)
        #[arg(short, long, default_value = "./scribe-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
    config: ScribeConfigManifest,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config, config_override, paths, yaml),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(
    config: ScribeConfigManifest,
    config_override: Option<PathBuf>,
    show_paths: bool,
    as_yaml: bool,
) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. SCRIBE_CONFIG_PATH: {}",
            std::env::var("SCRIBE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./scribe-config.yaml");
        println!("  4. ~/.scribe/config.yaml");
        println!("  5. /etc/scribe/config.yaml");
        println!();
    }

    if as_yaml {
        let mut redacted = config;
        for value in redacted.spec.llm.shared_secrets.values_mut() {
            if !value.starts_with("env:") {
                *value = "********".to_string();
            }
        }
        print!("{}", serde_yaml::to_string(&redacted)?);
        return Ok(());
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", spec.server.bind_address, spec.server.port);
    println!(
        "  Storage: {}",
        if spec.database.url.is_some() {
            "postgres"
        } else {
            "in-memory"
        }
    );
    println!();

    println!("{}", "Summaries:".bold());
    println!("  Provider: {}", spec.llm.provider);
    if let Some(endpoint) = &spec.llm.endpoint {
        println!("  Endpoint: {}", endpoint);
    }
    println!("  Model: {}", spec.llm.model.as_deref().unwrap_or("(provider default)"));
    println!(
        "  Retry: {} attempts, {:?} backoff",
        spec.llm.retry.max_attempts, spec.llm.retry.backoff
    );
    println!("  Stream timeout: {:?}", spec.llm.stream_timeout);
    println!("  Invalidate on update: {}", spec.summaries.invalidate_on_update);
    let mut shared: Vec<_> = spec.llm.shared_secrets.keys().collect();
    shared.sort();
    for key in shared {
        println!("  Shared secret: {}", key);
    }
    println!();

    println!("{}", "Logging:".bold());
    println!(
        "  {} ({})",
        spec.observability.logging.level, spec.observability.logging.format
    );
    println!();

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ScribeConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid() {
        for template in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let config = ScribeConfigManifest::from_yaml_str(template).unwrap();
            config.validate().unwrap();
        }
    }
}
