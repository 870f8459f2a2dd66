//! Distribution subcommand - record count per category value

use anyhow::Result;
use clap::Args;
use mabdb_query::{DistributionRequest, Engine};

use super::{FilterArgs, print_json};

#[derive(Args, Debug)]
pub struct DistributionArgs {
    /// Table to read
    #[arg(short, long, default_value = "ctgov_all")]
    pub table: String,

    /// Categorical column to count
    #[arg(long, default_value = "general_molecular_category")]
    pub column: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Case-insensitive antibody substring
    #[arg(short, long)]
    pub search: Option<String>,
}

pub fn run(args: DistributionArgs, engine: &Engine) -> Result<()> {
    let req = DistributionRequest {
        table: args.table,
        column: args.column,
        filters: args.filters.to_raw()?,
        search: args.search,
    };
    print_json(&engine.distribution(&req)?)
}
