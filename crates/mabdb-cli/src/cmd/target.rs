//! Target subcommand - rate spread across antibodies sharing a target

use anyhow::Result;
use clap::Args;
use mabdb_query::{Engine, TargetRequest};

use super::{FilterArgs, print_json};

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Target (target_1 value) shared by the antibodies
    pub target: String,

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

pub fn run(args: TargetArgs, engine: &Engine) -> Result<()> {
    let req = TargetRequest {
        table: args.table,
        target: args.target,
        group_by: args.group_by,
        filters: args.filters.to_raw()?,
        top_n: args.top_n,
    };
    print_json(&engine.target_aggregation(&req)?)
}
