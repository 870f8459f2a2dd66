//! Lookup subcommands - tables, filter options and the value lists the
//! chart pickers are populated from

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use mabdb_query::Engine;
use serde_json::json;

use super::print_json;

#[derive(Args, Debug)]
pub struct TablesArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TableArg {
    /// Table to read
    #[arg(short, long, default_value = "ctgov_all")]
    pub table: String,
}

#[derive(Args, Debug)]
pub struct StudiesArgs {
    /// Table to read
    #[arg(short, long, default_value = "ctgov_all")]
    pub table: String,

    /// Case-insensitive antibody substring
    #[arg(short, long)]
    pub antibody: Option<String>,
}

pub fn tables(args: TablesArgs, engine: &Engine) -> Result<()> {
    let tables = engine.tables()?;
    if args.json {
        return print_json(&json!({ "tables": tables }));
    }
    if tables.is_empty() {
        eprintln!("No known tables in {}.", engine.config().store_path.display());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Table").fg(Color::Cyan),
            Cell::new("Rows").fg(Color::Cyan),
        ]);
    for info in &tables {
        table.add_row(vec![
            Cell::new(&info.name),
            Cell::new(info.rows).set_alignment(CellAlignment::Right),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!("{} tables in {}", tables.len(), engine.config().store_path.display());
    Ok(())
}

pub fn filter_options(args: TableArg, engine: &Engine) -> Result<()> {
    print_json(&engine.filter_options(&args.table)?)
}

pub fn studies(args: StudiesArgs, engine: &Engine) -> Result<()> {
    let studies = engine.studies(&args.table, args.antibody.as_deref())?;
    print_json(&json!({ "studies": studies }))
}

pub fn overlapping(engine: &Engine) -> Result<()> {
    print_json(&json!({ "antibodies": engine.overlapping_antibodies()? }))
}

pub fn targets(args: TableArg, engine: &Engine) -> Result<()> {
    print_json(&json!({ "targets": engine.targets(&args.table)? }))
}

pub fn comparator(args: TableArg, engine: &Engine) -> Result<()> {
    print_json(&json!({ "antibodies": engine.antibodies_with_comparator(&args.table)? }))
}
