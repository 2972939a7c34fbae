use crate::indicators::frame::ColumnKind;
use crate::indicators::params::IndicatorParams;
use crate::indicators::registry::{IndicatorFunction, IndicatorRegistry};
use crate::indicators::resample::Timeframe;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read indicator configuration \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("indicator configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown indicator \"{0}\"")]
    UnknownIndicator(String),
    #[error("unknown interval \"{0}\"")]
    UnknownInterval(String),
    #[error("invalid mapped column name \"{0}\"")]
    InvalidColumnName(String),
}

/// One validated configuration entry: which function to run on which
/// timeframe, with which parameters, and how its output columns map to
/// stored column names. Unmapped outputs are dropped before the merge.
#[derive(Debug, Clone)]
pub struct IndicatorConfigEntry {
    pub interval: Timeframe,
    pub function: IndicatorFunction,
    pub parameters: IndicatorParams,
    pub mapping: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawConfigFile {
    #[serde(default)]
    securities: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    interval: String,
    indicator: String,
    #[serde(default)]
    parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    mapping: HashMap<String, String>,
}

// Mapped names end up as SQL identifiers, so they are restricted to the
// unquoted-identifier character set.
fn valid_column_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decode and validate the raw JSON configuration against the registry.
pub fn parse_indicator_config(
    raw: &str,
    registry: &IndicatorRegistry,
) -> Result<Vec<IndicatorConfigEntry>, ConfigError> {
    let file: RawConfigFile = serde_json::from_str(raw)?;
    let mut entries = Vec::with_capacity(file.securities.len());
    for raw_entry in file.securities {
        let interval = Timeframe::parse(&raw_entry.interval)
            .ok_or_else(|| ConfigError::UnknownInterval(raw_entry.interval.clone()))?;
        let function = registry
            .get(&raw_entry.indicator)
            .ok_or_else(|| ConfigError::UnknownIndicator(raw_entry.indicator.clone()))?;
        for stored in raw_entry.mapping.values() {
            if !valid_column_name(stored) {
                return Err(ConfigError::InvalidColumnName(stored.clone()));
            }
        }
        entries.push(IndicatorConfigEntry {
            interval,
            function,
            parameters: IndicatorParams::from_json(&raw_entry.parameters),
            mapping: raw_entry.mapping,
        });
    }
    Ok(entries)
}

pub fn load_indicator_config(
    path: &Path,
    registry: &IndicatorRegistry,
) -> Result<Vec<IndicatorConfigEntry>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_indicator_config(&raw, registry)
}

/// Every stored column the configuration maps to, with the kind of the
/// computed column behind it. Used to provision the indicators table at
/// startup. The first mapping of a name wins.
pub fn mapped_columns(entries: &[IndicatorConfigEntry]) -> Vec<(String, ColumnKind)> {
    let mut columns: Vec<(String, ColumnKind)> = Vec::new();
    for entry in entries {
        for (column, kind) in entry.function.columns {
            if let Some(stored) = entry.mapping.get(*column) {
                if !columns.iter().any(|(name, _)| name == stored) {
                    columns.push((stored.clone(), *kind));
                }
            }
        }
    }
    columns
}
