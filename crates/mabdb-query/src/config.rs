use std::path::PathBuf;

use mabdb_core::Table;

/// Configuration for opening and querying the store.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// DuckDB database produced by the ingest pipeline
    pub store_path: PathBuf,
    /// DuckDB memory limit (e.g. "2GB"); DuckDB's default when unset
    pub memory_limit: Option<String>,
    /// DuckDB worker threads; DuckDB's default when unset
    pub threads: Option<i64>,
    /// Largest page a paginated query may request
    pub max_page_size: u64,
    /// Trial-family table of the cross-dataset comparison
    pub cross_trial_table: Table,
    /// Label-family table of the cross-dataset comparison
    pub cross_label_table: Table,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("mab_database.duckdb"),
            memory_limit: None,
            threads: None,
            max_page_size: 1000,
            cross_trial_table: Table::CtgovAll,
            cross_label_table: Table::LabelFinal,
        }
    }
}
