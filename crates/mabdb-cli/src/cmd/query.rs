//! Query subcommand - one page of filtered records

use anyhow::Result;
use clap::Args;
use mabdb_query::{Engine, QueryRequest, SortDir};

use super::{FilterArgs, print_json};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Table to read
    #[arg(short, long, default_value = "ctgov_all")]
    pub table: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Case-insensitive antibody substring
    #[arg(short, long)]
    pub search: Option<String>,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: i64,

    /// Records per page (default: [query] default_page_size)
    #[arg(long)]
    pub page_size: Option<i64>,

    /// Column to sort by
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort direction (asc or desc)
    #[arg(long, default_value = "asc")]
    pub sort_dir: SortDir,
}

pub fn run(args: QueryArgs, engine: &Engine, config: &Config) -> Result<()> {
    let req = QueryRequest {
        table: args.table,
        filters: args.filters.to_raw()?,
        search: args.search,
        page: args.page,
        page_size: args.page_size.unwrap_or(config.query.default_page_size),
        sort_by: args.sort_by,
        sort_dir: args.sort_dir,
    };
    let page = engine.query(&req)?;
    log::info!(
        "Page {} of {} records ({} shown)",
        page.page,
        page.total,
        page.data.len()
    );
    print_json(&page)
}
