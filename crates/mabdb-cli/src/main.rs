//! mabdb - Query CLI for antibody trial and label safety data
//!
//! Filters, aggregates and compares adverse-event data from a DuckDB store
//! built by the ingest pipeline. Responses are printed as JSON on stdout.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mabdb_query::Engine;

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "mabdb")]
#[command(about = "Query CLI for antibody trial and label safety data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (generated SQL included)
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Config file path (default: ./mabdb.toml or ~/.config/mabdb/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// DuckDB store to read (overrides [store] path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// List tables present in the store
    Tables(cmd::lookup::TablesArgs),
    /// Distinct values of every filterable column of a table
    FilterOptions(cmd::lookup::TableArg),
    /// Page through filtered records
    Query(cmd::query::QueryArgs),
    /// Record counts per category value
    Distribution(cmd::distribution::DistributionArgs),
    /// Adverse-event rates per category
    AdverseEvents(cmd::adverse_events::AdverseEventArgs),
    /// Treatment vs comparator arm with relative risk
    Comparative(cmd::comparative::ComparativeArgs),
    /// Trial rates against label incidence for one antibody
    CrossDataset(cmd::cross_dataset::CrossDatasetArgs),
    /// Rate spread across antibodies sharing a target
    Target(cmd::target::TargetArgs),
    /// Trial identifiers of a table
    Studies(cmd::lookup::StudiesArgs),
    /// Antibodies present in both trial and label data
    Overlapping,
    /// Distinct targets of a table
    Targets(cmd::lookup::TableArg),
    /// Antibodies with comparator-arm data
    Comparator(cmd::lookup::TableArg),
    /// Write filtered records to CSV
    Export(cmd::export::ExportArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    mabdb_core::init_logging(cli.quiet, cli.debug);

    // Load configuration
    let mut config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };
    if let Some(store) = cli.store {
        config.store.path = store;
    }

    if let Command::Config = cli.command {
        print_config(&config);
        return Ok(());
    }

    let engine = Engine::open(config.engine_config()?)?;

    match cli.command {
        Command::Tables(args) => cmd::lookup::tables(args, &engine),
        Command::FilterOptions(args) => cmd::lookup::filter_options(args, &engine),
        Command::Query(args) => cmd::query::run(args, &engine, &config),
        Command::Distribution(args) => cmd::distribution::run(args, &engine),
        Command::AdverseEvents(args) => cmd::adverse_events::run(args, &engine, &config),
        Command::Comparative(args) => cmd::comparative::run(args, &engine),
        Command::CrossDataset(args) => cmd::cross_dataset::run(args, &engine),
        Command::Target(args) => cmd::target::run(args, &engine),
        Command::Studies(args) => cmd::lookup::studies(args, &engine),
        Command::Overlapping => cmd::lookup::overlapping(&engine),
        Command::Targets(args) => cmd::lookup::targets(args, &engine),
        Command::Comparator(args) => cmd::lookup::comparator(args, &engine),
        Command::Export(args) => cmd::export::run(args, &engine),
        Command::Config => Ok(()),
    }
}

fn print_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec!["Store", &config.store.path.display().to_string()]);
    table.add_row(vec![
        "Memory limit",
        config.store.memory_limit.as_deref().unwrap_or("DuckDB default"),
    ]);
    table.add_row(vec![
        "Threads",
        &config
            .store
            .threads
            .map_or_else(|| "DuckDB default".to_string(), |t| t.to_string()),
    ]);
    table.add_row(vec![
        "Page size",
        &format!(
            "{} (max: {})",
            config.query.default_page_size, config.query.max_page_size
        ),
    ]);
    table.add_row(vec!["Top N", &config.query.default_top_n.to_string()]);
    table.add_row(vec![
        "Cross-dataset tables",
        &format!(
            "{} / {}",
            config.cross_dataset.trial_table, config.cross_dataset.label_table
        ),
    ]);

    eprintln!("\n{table}");
}
