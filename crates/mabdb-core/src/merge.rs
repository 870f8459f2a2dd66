//! Aligns trial and label metrics for one antibody on a shared category axis

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{Bucket, truncate_top};

/// Category → metric for one dataset family.
pub type CategoryValues = BTreeMap<String, f64>;

/// Key reduced buckets by category.
pub fn category_values(buckets: &[Bucket]) -> CategoryValues {
    buckets
        .iter()
        .map(|b| (b.category().to_string(), b.value()))
        .collect()
}

/// One category of the merged axis. A family with no record for the
/// category is `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRow {
    pub category: String,
    pub trial: Option<f64>,
    pub label: Option<f64>,
}

/// Union the category keys of both families, rank by the larger of the two
/// values (a missing side counts as zero for ranking only) and keep `top_n`
/// rows (0 keeps all).
pub fn merge(trial: &CategoryValues, label: &CategoryValues, top_n: usize) -> Vec<MergedRow> {
    let mut keys: Vec<&String> = trial.keys().chain(label.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut rows: Vec<MergedRow> = keys
        .into_iter()
        .map(|k| MergedRow {
            category: k.clone(),
            trial: trial.get(k).copied(),
            label: label.get(k).copied(),
        })
        .collect();
    rows.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a)));
    truncate_top(&mut rows, top_n);
    rows
}

fn sort_key(row: &MergedRow) -> f64 {
    row.trial.unwrap_or(0.0).max(row.label.unwrap_or(0.0))
}
