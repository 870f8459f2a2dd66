//! Export subcommand - filtered records to CSV

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use mabdb_query::{Engine, ExportRequest, ExportRows};
use serde_json::Value;

use super::FilterArgs;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Table to export
    #[arg(short, long, default_value = "ctgov_all")]
    pub table: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Case-insensitive antibody substring
    #[arg(short, long)]
    pub search: Option<String>,

    /// Output CSV file (default: <table>_export.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: ExportArgs, engine: &Engine) -> Result<()> {
    let req = ExportRequest {
        table: args.table,
        filters: args.filters.to_raw()?,
        search: args.search,
    };
    let export = engine.export(&req)?;
    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}_export.csv", export.table)));

    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_csv(&mut out, &export)
        .and_then(|()| out.flush())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    eprintln!("Wrote {} rows to {}", export.rows.len(), path.display());
    Ok(())
}

fn write_csv(out: &mut impl Write, export: &ExportRows) -> std::io::Result<()> {
    write_record(out, export.columns.iter().map(|c| field(c)))?;
    for row in &export.rows {
        write_record(out, row.iter().map(cell))?;
    }
    Ok(())
}

fn write_record<'a>(
    out: &mut impl Write,
    fields: impl Iterator<Item = std::borrow::Cow<'a, str>>,
) -> std::io::Result<()> {
    for (i, f) in fields.enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        out.write_all(f.as_bytes())?;
    }
    out.write_all(b"\r\n")
}

/// Quote a field when it holds a delimiter, quote or line break.
fn field(s: &str) -> std::borrow::Cow<'_, str> {
    if s.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\"")).into()
    } else {
        s.into()
    }
}

/// Nulls are empty fields, strings are written unquoted where possible,
/// everything else in its JSON form.
fn cell(value: &Value) -> std::borrow::Cow<'static, str> {
    match value {
        Value::Null => "".into(),
        Value::String(s) => field(s).into_owned().into(),
        other => field(&other.to_string()).into_owned().into(),
    }
}
