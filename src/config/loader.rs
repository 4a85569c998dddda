//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::DiscoverySettings;
use crate::config::snapshot::ConfigSnapshot;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// The live file was not readable at startup, so reloads are off.
    #[error("configuration file disabled")]
    Disabled,
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate host settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<DiscoverySettings, ConfigError> {
    let content = fs::read_to_string(path)?;
    let settings: DiscoverySettings = toml::from_str(&content)?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}

/// Read the live key/value file into a fresh snapshot.
pub fn load_snapshot(path: &Path) -> Result<ConfigSnapshot, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_snapshot(&content)
}

/// Parse TOML into a flat snapshot.
///
/// Strings are kept verbatim, other scalars use their TOML text
/// (`resolutionTimeout = 45` reads as `"45"`), and nested tables are
/// flattened to dotted keys.
pub fn parse_snapshot(content: &str) -> Result<ConfigSnapshot, ConfigError> {
    let table: toml::Table = content.parse()?;

    let mut pairs = Vec::new();
    flatten("", &table, &mut pairs);
    Ok(pairs.into_iter().collect())
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut Vec<(String, String)>) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            toml::Value::Table(nested) => flatten(&key, nested, out),
            toml::Value::String(s) => out.push((key, s.clone())),
            other => out.push((key, other.to_string())),
        }
    }
}
