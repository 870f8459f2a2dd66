//! Cross-antibody spread of adverse-event rates for drugs sharing a target
//!
//! Rates are normalised per antibody first (each drug against its own
//! denominator) and only then summarised across antibodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{GroupTotals, round_to, truncate_top};
use crate::schema::Family;

/// Summary of per-antibody rates within one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRow {
    pub category: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Distinct antibodies contributing a rate.
    pub count: usize,
}

/// Reduce groups keyed by (category, antibody) into one row per category,
/// ranked by mean descending and truncated to `top_n` (0 keeps all).
///
/// Groups without an entity are ignored, as are groups the family rule
/// suppresses (no usable denominator).
pub fn reduce_targets(family: Family, groups: Vec<GroupTotals>, top_n: usize) -> Vec<TargetRow> {
    let mut by_category: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for group in groups {
        let Some(rate) = family.group_rate(&group) else {
            continue;
        };
        let Some(entity) = group.entity else {
            continue;
        };
        by_category
            .entry(group.category)
            .or_default()
            .insert(entity, round_to(rate, 2));
    }

    let mut rows: Vec<TargetRow> = by_category
        .into_iter()
        .filter_map(|(category, rates)| summarize(category, rates.into_values().collect()))
        .collect();
    rows.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    truncate_top(&mut rows, top_n);
    rows
}

fn summarize(category: String, rates: Vec<f64>) -> Option<TargetRow> {
    if rates.is_empty() {
        return None;
    }
    let count = rates.len();
    let min = rates.iter().copied().fold(f64::INFINITY, f64::min);
    let max = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = rates.iter().sum::<f64>() / count as f64;
    Some(TargetRow {
        category,
        mean: round_to(mean, 2),
        min: round_to(min, 2),
        max: round_to(max, 2),
        count,
    })
}
