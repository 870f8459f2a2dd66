//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mabdb_core::{Family, Table};
use mabdb_query::EngineConfig;
use serde::Deserialize;

/// Global configuration for mabdb
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub query: QueryConfig,
    pub cross_dataset: CrossDatasetConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(deserialize_with = "deserialize_env_path")]
    pub path: PathBuf,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub memory_limit: Option<String>,
    pub threads: Option<i64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./mab_database.duckdb"),
            memory_limit: None,
            threads: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_page_size: i64,
    pub max_page_size: u64,
    pub default_top_n: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 1000,
            default_top_n: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrossDatasetConfig {
    pub trial_table: String,
    pub label_table: String,
}

impl Default for CrossDatasetConfig {
    fn default() -> Self {
        Self {
            trial_table: "ctgov_all".to_string(),
            label_table: "label_final".to_string(),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Like [`deserialize_env_var`], but the store path is mandatory once given
fn deserialize_env_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    expand_env_var(&raw)
        .map(PathBuf::from)
        .ok_or_else(|| serde::de::Error::custom(format!("environment variable in {raw} is not set")))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

fn cross_table(name: &str, family: Family) -> Result<Table> {
    let table = Table::parse(name).with_context(|| format!("cross_dataset: {name}"))?;
    if table.family() != family {
        anyhow::bail!("cross_dataset: {name} is a {} table, expected {family}", table.family());
    }
    Ok(table)
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./mabdb.toml (current directory)
    /// 2. ~/.config/mabdb/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("mabdb.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "mabdb") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Engine settings, with the cross-dataset tables resolved and checked
    pub fn engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            store_path: self.store.path.clone(),
            memory_limit: self.store.memory_limit.clone(),
            threads: self.store.threads,
            max_page_size: self.query.max_page_size,
            cross_trial_table: cross_table(&self.cross_dataset.trial_table, Family::Trial)?,
            cross_label_table: cross_table(&self.cross_dataset.label_table, Family::Label)?,
        })
    }
}
