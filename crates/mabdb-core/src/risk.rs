//! Relative risk with a log-scale Wald 95% confidence interval

use serde::Serialize;

use crate::aggregate::round_to;

const Z_95: f64 = 1.96;

/// Event count and denominator of one arm, either possibly missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArmCounts {
    pub events: Option<f64>,
    pub denominator: Option<f64>,
}

impl ArmCounts {
    pub fn new(events: f64, denominator: f64) -> Self {
        Self {
            events: Some(events),
            denominator: Some(denominator),
        }
    }

    /// Events per participant, undefined without a positive denominator.
    fn rate(&self) -> Option<(f64, f64, f64)> {
        let events = self.events?;
        let n = self.denominator.filter(|n| *n > 0.0)?;
        Some((events, n, events / n))
    }

    /// Percentage rate rounded for display, `None` when undefined.
    pub fn proportion(&self) -> Option<f64> {
        self.rate().map(|(_, _, r)| round_to(r * 100.0, 2))
    }
}

/// Outcome of comparing an exposed arm with a comparator arm.
///
/// The variants are the three states a comparison can end in; nothing here
/// is an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelativeRisk {
    /// No usable ratio: missing or zero denominator, or zero comparator rate.
    Undefined,
    /// Ratio without an interval: zero events in an arm, or a degenerate
    /// variance.
    RatioOnly { ratio: f64 },
    Interval { ratio: f64, lower: f64, upper: f64 },
}

impl RelativeRisk {
    pub fn compute(exposed: ArmCounts, comparator: ArmCounts) -> Self {
        let (Some((a, n1, exposed_rate)), Some((c, n2, comparator_rate))) =
            (exposed.rate(), comparator.rate())
        else {
            return Self::Undefined;
        };
        if comparator_rate == 0.0 {
            return Self::Undefined;
        }
        let ratio = round_to(exposed_rate / comparator_rate, 3);
        if !ratio.is_finite() {
            return Self::Undefined;
        }
        if a <= 0.0 || c <= 0.0 {
            return Self::RatioOnly { ratio };
        }

        let variance = 1.0 / a - 1.0 / n1 + 1.0 / c - 1.0 / n2;
        if variance < 0.0 || ratio <= 0.0 {
            return Self::RatioOnly { ratio };
        }
        let se = variance.sqrt();
        let log_ratio = ratio.ln();
        let lower = round_to((log_ratio - Z_95 * se).exp(), 3);
        let upper = round_to((log_ratio + Z_95 * se).exp(), 3);
        if lower.is_finite() && upper.is_finite() {
            Self::Interval {
                ratio,
                lower,
                upper,
            }
        } else {
            Self::RatioOnly { ratio }
        }
    }

    /// Ratio of two pre-computed percentages. There are no counts to derive
    /// a variance from, so the result never carries an interval.
    pub fn from_percentages(exposed: Option<f64>, comparator: Option<f64>) -> Self {
        match (exposed, comparator) {
            (Some(e), Some(c)) if c > 0.0 && e >= 0.0 => Self::RatioOnly {
                ratio: round_to(e / c, 3),
            },
            _ => Self::Undefined,
        }
    }

    pub fn ratio(&self) -> Option<f64> {
        match *self {
            Self::Undefined => None,
            Self::RatioOnly { ratio } | Self::Interval { ratio, .. } => Some(ratio),
        }
    }

    pub fn lower(&self) -> Option<f64> {
        match *self {
            Self::Interval { lower, .. } => Some(lower),
            _ => None,
        }
    }

    pub fn upper(&self) -> Option<f64> {
        match *self {
            Self::Interval { upper, .. } => Some(upper),
            _ => None,
        }
    }
}

/// Column-oriented relative risks for a chart, one slot per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskSeries {
    pub values: Vec<Option<f64>>,
    pub ci_lower: Vec<Option<f64>>,
    pub ci_upper: Vec<Option<f64>>,
}

impl FromIterator<RelativeRisk> for RiskSeries {
    fn from_iter<I: IntoIterator<Item = RelativeRisk>>(iter: I) -> Self {
        let mut series = Self::default();
        for rr in iter {
            series.values.push(rr.ratio());
            series.ci_lower.push(rr.lower());
            series.ci_upper.push(rr.upper());
        }
        series
    }
}
