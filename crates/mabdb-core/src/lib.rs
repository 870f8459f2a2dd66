//! mabdb-core: query building and aggregation for antibody safety data
//!
//! Store-independent pieces of the engine: the schema registry, filter
//! predicates, per-family reduction, relative risk, the cross-dataset merge
//! and the target aggregation. `mabdb-query` wires them to DuckDB.

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod logging;
pub mod merge;
pub mod risk;
pub mod schema;
pub mod target;

// Re-exports for convenience
pub use aggregate::{Bucket, CategorySeries, GroupTotals, reduce, round_to};
pub use error::{QueryError, Result};
pub use filter::{FilterSpec, Param, Predicate, RawFilters};
pub use logging::init_logging;
pub use merge::{CategoryValues, MergedRow, category_values, merge};
pub use risk::{ArmCounts, RelativeRisk, RiskSeries};
pub use schema::{Attribute, AttributeKind, Family, Table};
pub use target::{TargetRow, reduce_targets};
