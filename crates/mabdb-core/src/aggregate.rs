//! Per-family reduction of grouped records into comparable buckets
//!
//! The store does the grouping and hands back partial totals; the rules for
//! turning those into a rate (and for suppressing groups with no usable
//! denominator) live here so both families are reduced in one place.

use serde::Serialize;

use crate::schema::Family;

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Partial totals for one group, as produced by the store.
///
/// Trial data: `numerator` is the summed exposed-arm events and
/// `denominator` the summed exposed-arm participants. Label data:
/// `numerator` is the summed incidence percentage and `denominator` the
/// number of non-null percentages. `records` counts contributing rows.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotals {
    pub category: String,
    /// Set when grouped at the entity grain (one antibody per group).
    pub entity: Option<String>,
    pub numerator: f64,
    pub denominator: f64,
    pub records: u64,
}

impl GroupTotals {
    pub fn new(category: impl Into<String>, numerator: f64, denominator: f64, records: u64) -> Self {
        Self {
            category: category.into(),
            entity: None,
            numerator,
            denominator,
            records,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl Family {
    /// Unrounded group metric: percentage event rate for trial data, mean
    /// incidence percentage for label data. `None` suppresses the group.
    pub fn group_rate(self, totals: &GroupTotals) -> Option<f64> {
        if totals.denominator <= 0.0 {
            return None;
        }
        let rate = match self {
            Family::Trial => totals.numerator / totals.denominator * 100.0,
            Family::Label => totals.numerator / totals.denominator,
        };
        rate.is_finite().then_some(rate)
    }

    fn bucket(self, totals: GroupTotals) -> Option<Bucket> {
        let rate = round_to(self.group_rate(&totals)?, 2);
        Some(match self {
            Family::Trial => Bucket::Trial {
                category: totals.category,
                events: totals.numerator,
                denominator: totals.denominator,
                rate,
            },
            Family::Label => Bucket::Label {
                category: totals.category,
                mean_pct: rate,
                samples: totals.records,
            },
        })
    }
}

/// Reduced summary of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum Bucket {
    Trial {
        category: String,
        events: f64,
        denominator: f64,
        rate: f64,
    },
    Label {
        category: String,
        mean_pct: f64,
        samples: u64,
    },
}

impl Bucket {
    pub fn category(&self) -> &str {
        match self {
            Self::Trial { category, .. } | Self::Label { category, .. } => category,
        }
    }

    /// Display metric, a percentage in both families.
    pub fn value(&self) -> f64 {
        match *self {
            Self::Trial { rate, .. } => rate,
            Self::Label { mean_pct, .. } => mean_pct,
        }
    }

    /// Events for trial data, contributing records for label data.
    pub fn count(&self) -> f64 {
        match *self {
            Self::Trial { events, .. } => events,
            Self::Label { samples, .. } => samples as f64,
        }
    }

    /// Magnitude the buckets are ranked by: event volume for trial data,
    /// mean incidence for label data.
    fn rank_key(&self) -> f64 {
        match *self {
            Self::Trial { events, .. } => events,
            Self::Label { mean_pct, .. } => mean_pct,
        }
    }
}

/// Reduce grouped totals to buckets, drop suppressed groups, rank
/// descending and keep `top_n` (0 keeps everything).
///
/// Ties keep their input order, so callers feed groups in a stable order.
pub fn reduce(family: Family, groups: Vec<GroupTotals>, top_n: usize) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = groups
        .into_iter()
        .filter_map(|g| family.bucket(g))
        .collect();
    buckets.sort_by(|a, b| b.rank_key().total_cmp(&a.rank_key()));
    truncate_top(&mut buckets, top_n);
    buckets
}

pub(crate) fn truncate_top<T>(items: &mut Vec<T>, top_n: usize) {
    if top_n > 0 {
        items.truncate(top_n);
    }
}

/// Column-oriented chart payload built from ranked buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorySeries {
    pub categories: Vec<String>,
    pub proportions: Vec<f64>,
    pub counts: Vec<f64>,
}

impl From<Vec<Bucket>> for CategorySeries {
    fn from(buckets: Vec<Bucket>) -> Self {
        let mut series = Self::default();
        for b in buckets {
            series.proportions.push(b.value());
            series.counts.push(b.count());
            series.categories.push(match b {
                Bucket::Trial { category, .. } | Bucket::Label { category, .. } => category,
            });
        }
        series
    }
}
