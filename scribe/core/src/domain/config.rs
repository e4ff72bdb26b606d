// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Scribe Configuration Types
//
// Defines the configuration schema for a Scribe service node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP server and storage settings
// - Summary provider selection, retry policy and generation parameters
// - Observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const KIND: &str = "ScribeConfig";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScribeConfigManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ScribeConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: ScribeConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScribeConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage; documents live in memory when no database URL is set
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub summaries: SummariesConfig,

    #[serde(default)]
    pub event_bus: EventBusConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Gemini,
    OpenAi,
    Mock,
}

impl std::str::FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unsupported provider '{}'", other)),
        }
    }
}

impl std::fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: LlmProviderKind,

    /// API base URL override (OpenAI-compatible servers, test doubles)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model used when no tenant secret names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Overall budget for one streamed summary
    #[serde(default = "default_stream_timeout", with = "humantime_serde")]
    pub stream_timeout: Duration,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default)]
    pub thinking_budget: u32,

    /// Shared secrets visible to every tenant (values support "env:VAR_NAME")
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub shared_secrets: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each further attempt
    #[serde(default = "default_backoff", with = "humantime_serde")]
    pub backoff: Duration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummariesConfig {
    /// Clear a stored summary when its document is edited
    #[serde(default)]
    pub invalidate_on_update: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    #[serde(default = "default_event_bus_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_connections() -> u32 {
    5
}

fn default_provider() -> LlmProviderKind {
    LlmProviderKind::Gemini
}

fn default_stream_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_max_attempts() -> u32 {
    2
}

fn default_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_event_bus_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            model: None,
            retry: RetryConfig::default(),
            stream_timeout: default_stream_timeout(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            thinking_budget: 0,
            shared_secrets: HashMap::new(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: default_backoff(),
        }
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_bus_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ScribeConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "scribe".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ScribeConfigSpec::default(),
        }
    }
}

impl ScribeConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SCRIBE_CONFIG_PATH environment variable
    /// 2. ./scribe-config.yaml (working directory)
    /// 3. ~/.scribe/config.yaml (user home)
    /// 4. /etc/scribe/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SCRIBE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./scribe-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".scribe").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/scribe/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `lookup`. Unparseable values are logged and
    /// ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            tracing::info!("Environment override: DATABASE_URL");
            self.spec.database.url = Some(url);
        }

        if let Some(val) = lookup("LLM_PROVIDER") {
            match val.parse::<LlmProviderKind>() {
                Ok(kind) => self.spec.llm.provider = kind,
                Err(e) => tracing::warn!("Invalid value for LLM_PROVIDER: {}. Ignoring.", e),
            }
        }

        let llm = &mut self.spec.llm;
        if let Some(n) = parse_env::<u32>(&lookup, "LLM_RETRY_ATTEMPTS") {
            llm.retry.max_attempts = n.max(1);
        }
        if let Some(backoff) = parse_env_seconds(&lookup, "LLM_RETRY_BACKOFF_S") {
            llm.retry.backoff = backoff;
        }
        if let Some(timeout) = parse_env_seconds(&lookup, "LLM_STREAM_TIMEOUT_S") {
            llm.stream_timeout = timeout;
        }
        if let Some(t) = parse_env::<f32>(&lookup, "LLM_TEMPERATURE") {
            llm.temperature = t;
        }
        if let Some(n) = parse_env::<u32>(&lookup, "LLM_MAX_OUTPUT_TOKENS") {
            llm.max_output_tokens = n;
        }
        if let Some(n) = parse_env::<u32>(&lookup, "LLM_THINKING_BUDGET") {
            llm.thinking_budget = n;
        }

        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.spec.observability.logging.level = level.to_lowercase();
        }
        if let Some(port) = parse_env::<u16>(&lookup, "SCRIBE_PORT") {
            self.spec.server.port = port;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let llm = &self.spec.llm;
        if llm.retry.max_attempts == 0 {
            anyhow::bail!("spec.llm.retry.max_attempts must be at least 1");
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            anyhow::bail!("spec.llm.temperature must be between 0.0 and 2.0");
        }

        if llm.provider == LlmProviderKind::OpenAi && llm.endpoint.as_deref().is_some_and(str::is_empty) {
            anyhow::bail!("spec.llm.endpoint cannot be empty when set");
        }

        match self.spec.observability.logging.format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("Invalid logging format '{}'. Expected 'text' or 'json'", other),
        }

        if self.spec.event_bus.capacity == 0 {
            anyhow::bail!("spec.event_bus.capacity must be greater than zero");
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => {
            tracing::info!("Environment override: {}={}", key, raw);
            Some(value)
        }
        Err(_) => {
            tracing::warn!("Invalid value for {}: '{}'. Ignoring.", key, raw);
            None
        }
    }
}

/// Fractional seconds; negative values clamp to zero, NaN, infinite or
/// out-of-range values are ignored.
fn parse_env_seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let secs = parse_env::<f64>(lookup, key)?;
    let secs = if secs < 0.0 { 0.0 } else { secs };
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => Some(duration),
        Err(e) => {
            tracing::warn!("Invalid value for {}: {}. Ignoring.", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = ScribeConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.llm.retry.max_attempts, 2);
        assert_eq!(manifest.spec.llm.retry.backoff, Duration::from_millis(500));
        assert_eq!(manifest.spec.llm.stream_timeout, Duration::from_secs(120));
        assert!(!manifest.spec.summaries.invalidate_on_update);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = r#"
apiVersion: 100monkeys.ai/v1
kind: ScribeConfig
metadata:
  name: test-node
spec:
  llm:
    provider: mock
    stream_timeout: 30s
    retry:
      max_attempts: 3
      backoff: 250ms
  summaries:
    invalidate_on_update: true
"#;
        let manifest = ScribeConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.llm.provider, LlmProviderKind::Mock);
        assert_eq!(manifest.spec.llm.stream_timeout, Duration::from_secs(30));
        assert_eq!(manifest.spec.llm.retry.max_attempts, 3);
        assert_eq!(manifest.spec.llm.retry.backoff, Duration::from_millis(250));
        assert!(manifest.spec.summaries.invalidate_on_update);
        assert_eq!(manifest.spec.server.port, 8000);
        assert!(manifest.spec.database.url.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LLM_PROVIDER", "openai"),
            ("LLM_RETRY_ATTEMPTS", "4"),
            ("LLM_RETRY_BACKOFF_S", "1.5"),
            ("LLM_STREAM_TIMEOUT_S", "not-a-number"),
            ("LLM_MAX_OUTPUT_TOKENS", "1024"),
            ("SCRIBE_PORT", "9090"),
        ]);
        let mut manifest = ScribeConfigManifest::default();
        manifest.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(manifest.spec.llm.provider, LlmProviderKind::OpenAi);
        assert_eq!(manifest.spec.llm.retry.max_attempts, 4);
        assert_eq!(manifest.spec.llm.retry.backoff, Duration::from_millis(1500));
        assert_eq!(manifest.spec.llm.stream_timeout, Duration::from_secs(120));
        assert_eq!(manifest.spec.llm.max_output_tokens, 1024);
        assert_eq!(manifest.spec.server.port, 9090);
    }

    #[test]
    fn test_out_of_range_durations_keep_defaults() {
        for raw in ["inf", "1e30", "NaN"] {
            let mut manifest = ScribeConfigManifest::default();
            manifest.apply_overrides_from(|k: &str| match k {
                "LLM_RETRY_BACKOFF_S" | "LLM_STREAM_TIMEOUT_S" => Some(raw.to_string()),
                _ => None,
            });
            let defaults = ScribeConfigManifest::default();
            assert_eq!(manifest.spec.llm.stream_timeout, defaults.spec.llm.stream_timeout, "{raw}");
            assert_eq!(manifest.spec.llm.retry.backoff, defaults.spec.llm.retry.backoff, "{raw}");
        }

        let mut manifest = ScribeConfigManifest::default();
        manifest.apply_overrides_from(|k: &str| (k == "LLM_STREAM_TIMEOUT_S").then(|| "-3".to_string()));
        assert_eq!(manifest.spec.llm.stream_timeout, Duration::ZERO);
    }

    #[test]
    fn test_retry_attempts_floor_is_one() {
        let mut manifest = ScribeConfigManifest::default();
        manifest.apply_overrides_from(|k| (k == "LLM_RETRY_ATTEMPTS").then(|| "0".to_string()));
        assert_eq!(manifest.spec.llm.retry.max_attempts, 1);
    }

    #[test]
    fn test_validation() {
        let mut manifest = ScribeConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.observability.logging.format = "xml".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.observability.logging.format = "json".to_string();

        manifest.spec.llm.retry.max_attempts = 0;
        assert!(manifest.validate().is_err());
    }
}
