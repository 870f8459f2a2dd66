//! Request and response shapes of the engine's operations
//!
//! Requests deserialize from the JSON bodies the web client sends, with the
//! same defaults; responses serialize to the payloads it renders.

use mabdb_core::{CategorySeries, RawFilters, RiskSeries, TargetRow};
use serde::{Deserialize, Serialize};

fn default_table() -> String {
    "ctgov_all".into()
}

fn default_group_by() -> String {
    "organ_system".into()
}

fn default_column() -> String {
    "general_molecular_category".into()
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    50
}

fn default_top_n() -> usize {
    20
}

fn default_arm_top_n() -> usize {
    15
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl std::str::FromStr for SortDir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("sort direction must be asc or desc, got {other}")),
        }
    }
}

/// Paginated, filtered, optionally sorted record listing.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub filters: RawFilters,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_dir: SortDir,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPage {
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistributionRequest {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_column")]
    pub column: String,
    #[serde(default)]
    pub filters: RawFilters,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdverseEventRequest {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_group_by")]
    pub group_by: String,
    #[serde(default)]
    pub filters: RawFilters,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

/// `{categories, proportions, counts}` per category.
pub type AdverseEventChart = CategorySeries;

#[derive(Debug, Clone, Deserialize)]
pub struct ComparativeRequest {
    #[serde(default = "default_table")]
    pub table: String,
    pub antibody: String,
    #[serde(default)]
    pub nct_id: Option<String>,
    #[serde(default = "default_group_by")]
    pub group_by: String,
    #[serde(default)]
    pub filters: RawFilters,
    #[serde(default = "default_arm_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArmSeries {
    pub categories: Vec<String>,
    pub proportions: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparativeChart {
    pub ab_arm: ArmSeries,
    pub comp_arm: ArmSeries,
    pub relative_risk: RiskSeries,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrossDatasetRequest {
    pub antibody: String,
    #[serde(default = "default_group_by")]
    pub group_by: String,
    /// Categories to keep; absent or 0 keeps the whole union
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesValues {
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossDatasetChart {
    pub categories: Vec<String>,
    pub ctgov: SeriesValues,
    pub label: SeriesValues,
    pub antibody: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetRequest {
    #[serde(default = "default_table")]
    pub table: String,
    pub target: String,
    #[serde(default = "default_group_by")]
    pub group_by: String,
    #[serde(default)]
    pub filters: RawFilters,
    #[serde(default = "default_arm_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetAggregation {
    pub target: String,
    pub data: Vec<TargetRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub filters: RawFilters,
    #[serde(default)]
    pub search: Option<String>,
}

/// Matching records of an export, column-ordered as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRows {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_request_defaults() {
        let req: QueryRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.table, "ctgov_all");
        assert_eq!((req.page, req.page_size), (1, 50));
        assert_eq!(req.sort_dir, SortDir::Asc);
        assert!(req.filters.is_empty());
    }

    #[test]
    fn sort_dir_any_case() {
        let req: QueryRequest = serde_json::from_value(json!({"sort_dir": "DESC"})).unwrap();
        assert_eq!(req.sort_dir, SortDir::Desc);
        assert_eq!("Desc".parse::<SortDir>().unwrap(), SortDir::Desc);
        assert!("up".parse::<SortDir>().is_err());
    }

    #[test]
    fn comparative_requires_antibody() {
        assert!(serde_json::from_value::<ComparativeRequest>(json!({})).is_err());
        let req: ComparativeRequest =
            serde_json::from_value(json!({"antibody": "mab-a"})).unwrap();
        assert_eq!((req.group_by.as_str(), req.top_n), ("organ_system", 15));
    }

    #[test]
    fn cross_dataset_top_n_optional() {
        let req: CrossDatasetRequest =
            serde_json::from_value(json!({"antibody": "mab-a"})).unwrap();
        assert_eq!(req.top_n, None);
        let req: CrossDatasetRequest =
            serde_json::from_value(json!({"antibody": "mab-a", "top_n": 3})).unwrap();
        assert_eq!(req.top_n, Some(3));
    }

    #[test]
    fn cross_dataset_shape() {
        let chart = CrossDatasetChart {
            categories: vec!["Cardiac".into()],
            ctgov: SeriesValues {
                values: vec![Some(10.0)],
            },
            label: SeriesValues { values: vec![None] },
            antibody: "mab-a".into(),
        };
        assert_eq!(
            serde_json::to_value(chart).unwrap(),
            json!({
                "categories": ["Cardiac"],
                "ctgov": {"values": [10.0]},
                "label": {"values": [null]},
                "antibody": "mab-a"
            })
        );
    }
}
