//! Comparative subcommand - treatment vs comparator arm with relative risk

use anyhow::Result;
use clap::Args;
use mabdb_query::{ComparativeRequest, Engine};

use super::{FilterArgs, print_json};

#[derive(Args, Debug)]
pub struct ComparativeArgs {
    /// Antibody whose arms are compared
    #[arg(short, long)]
    pub antibody: String,

    /// Restrict to one trial (trial tables only)
    #[arg(long)]
    pub nct_id: Option<String>,

    /// Table to read
    #[arg(short, long, default_value = "ctgov_all")]
    pub table: String,

    /// Categorical column to group by
    #[arg(short, long, default_value = "organ_system")]
    pub group_by: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Categories to keep, 0 for all
    #[arg(short = 'n', long, default_value_t = 15)]
    pub top_n: usize,
}

pub fn run(args: ComparativeArgs, engine: &Engine) -> Result<()> {
    let req = ComparativeRequest {
        table: args.table,
        antibody: args.antibody,
        nct_id: args.nct_id,
        group_by: args.group_by,
        filters: args.filters.to_raw()?,
        top_n: args.top_n,
    };
    print_json(&engine.comparative(&req)?)
}
