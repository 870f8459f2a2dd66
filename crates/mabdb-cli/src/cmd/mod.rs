//! Subcommands, one module per query surface

pub mod adverse_events;
pub mod comparative;
pub mod cross_dataset;
pub mod distribution;
pub mod export;
pub mod lookup;
pub mod query;
pub mod target;

use anyhow::{Context, Result};
use clap::Args;
use mabdb_core::RawFilters;
use serde::Serialize;
use serde_json::Value;

/// Attribute filters shared by the record and chart commands.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Constrain an attribute, ATTR=VALUE (repeat to allow several values)
    #[arg(short = 'f', long = "filter", value_name = "ATTR=VALUE")]
    pub filter: Vec<String>,

    /// Filters as a JSON object, e.g. '{"phase": ["Phase 3"]}'
    #[arg(long, value_name = "JSON")]
    pub filters: Option<String>,
}

impl FilterArgs {
    /// Merge `--filters` and every `--filter` into one mapping.
    pub fn to_raw(&self) -> Result<RawFilters> {
        let mut raw: RawFilters = match &self.filters {
            Some(json) => serde_json::from_str(json).context("--filters must be a JSON object")?,
            None => RawFilters::new(),
        };
        for pair in &self.filter {
            let (attr, value) = pair
                .split_once('=')
                .with_context(|| format!("--filter expects ATTR=VALUE, got {pair}"))?;
            match raw
                .entry(attr.to_string())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                Value::Array(values) => values.push(Value::String(value.to_string())),
                other => anyhow::bail!("{attr}: cannot add {value} to non-list filter {other}"),
            }
        }
        Ok(raw)
    }
}

/// Response payloads go to stdout, logs to stderr.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
