//! Adverse-events subcommand - ranked rates per category

use anyhow::Result;
use clap::Args;
use mabdb_query::{AdverseEventRequest, Engine};

use super::{FilterArgs, print_json};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct AdverseEventArgs {
    /// Table to aggregate
    #[arg(short, long, default_value = "ctgov_all")]
    pub table: String,

    /// Categorical column to group by
    #[arg(short, long, default_value = "organ_system")]
    pub group_by: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Case-insensitive antibody substring
    #[arg(short, long)]
    pub search: Option<String>,

    /// Categories to keep, 0 for all (default: [query] default_top_n)
    #[arg(short = 'n', long)]
    pub top_n: Option<usize>,
}

pub fn run(args: AdverseEventArgs, engine: &Engine, config: &Config) -> Result<()> {
    let req = AdverseEventRequest {
        table: args.table,
        group_by: args.group_by,
        filters: args.filters.to_raw()?,
        search: args.search,
        top_n: args.top_n.unwrap_or(config.query.default_top_n),
    };
    print_json(&engine.adverse_events(&req)?)
}
