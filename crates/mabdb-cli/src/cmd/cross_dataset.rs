//! Cross-dataset subcommand - trial rates against label incidence

use anyhow::Result;
use clap::Args;
use mabdb_query::{CrossDatasetRequest, Engine};

use super::print_json;

#[derive(Args, Debug)]
pub struct CrossDatasetArgs {
    /// Antibody to compare across datasets
    #[arg(short, long)]
    pub antibody: String,

    /// Categorical column to group by
    #[arg(short, long, default_value = "organ_system")]
    pub group_by: String,

    /// Categories to keep (default: all)
    #[arg(short = 'n', long)]
    pub top_n: Option<usize>,
}

pub fn run(args: CrossDatasetArgs, engine: &Engine) -> Result<()> {
    let req = CrossDatasetRequest {
        antibody: args.antibody,
        group_by: args.group_by,
        top_n: args.top_n,
    };
    print_json(&engine.cross_dataset(&req)?)
}
