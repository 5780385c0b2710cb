use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;

/// Bundled environment table, loaded once at `setup`.
const ENVIRONMENT_TABLE: &str = include_str!("../../data/environments.json");

static CONFIG: OnceLock<EnvironmentConfig> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment name is missing")]
    EnvironmentMissing,

    #[error("environment `{0}` is not allowed")]
    EnvironmentNotAllowed(String),

    #[error("environment already configured")]
    AlreadyConfigured,

    #[error("environment not configured, call Environment::setup first")]
    NotConfigured,

    #[error("invalid environment table: {0}")]
    InvalidEnvironmentTable(String),
}

/// Runtime environment names in the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentName {
    Testnet,
    Production,
}

impl EnvironmentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Testnet => "testnet",
            Self::Production => "production",
        }
    }
}

impl FromStr for EnvironmentName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "testnet" => Ok(Self::Testnet),
            "production" => Ok(Self::Production),
            other => Err(ConfigError::EnvironmentNotAllowed(other.to_string())),
        }
    }
}

impl std::fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved base URLs for one environment.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub name: EnvironmentName,
    pub http_base_url: String,
    pub stream_base_url: String,
}

#[derive(Debug, Deserialize)]
struct EnvironmentEntry {
    http_base_url: String,
    stream_base_url: String,
}

/// Process-wide environment resolver.
///
/// All client instances in a process share one resolved environment. The
/// value is assigned exactly once; `setup` returns a reference the caller
/// passes to client and session constructors.
pub struct Environment;

impl Environment {
    /// Resolve `name` against the bundled table and freeze it for the
    /// process lifetime.
    pub fn setup(name: &str) -> Result<&'static EnvironmentConfig, ConfigError> {
        if CONFIG.get().is_some() {
            return Err(ConfigError::AlreadyConfigured);
        }

        let config = resolve(name)?;

        // Two initialization paths can race here; OnceLock::set arbitrates
        // and the loser reports AlreadyConfigured.
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::AlreadyConfigured)?;
        Self::current()
    }

    /// The resolved config, or `NotConfigured` before any `setup`.
    pub fn current() -> Result<&'static EnvironmentConfig, ConfigError> {
        CONFIG.get().ok_or(ConfigError::NotConfigured)
    }
}

/// Pure resolution step, separated from the one-shot gate so the error
/// paths stay testable.
fn resolve(name: &str) -> Result<EnvironmentConfig, ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::EnvironmentMissing);
    }

    let name = EnvironmentName::from_str(name)?;

    let mut table: HashMap<String, EnvironmentEntry> = serde_json::from_str(ENVIRONMENT_TABLE)
        .map_err(|e| ConfigError::InvalidEnvironmentTable(e.to_string()))?;

    let entry = table
        .remove(name.as_str())
        .ok_or_else(|| ConfigError::EnvironmentNotAllowed(name.as_str().to_string()))?;

    Ok(EnvironmentConfig {
        name,
        http_base_url: entry.http_base_url,
        stream_base_url: entry.stream_base_url,
    })
}
