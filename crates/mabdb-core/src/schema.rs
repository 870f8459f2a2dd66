//! Schema registry: dataset families, physical tables and their attributes
//!
//! Every column name that reaches generated SQL is looked up here first,
//! so caller-supplied names never become identifiers on their own.

use std::fmt;

use crate::error::{QueryError, Result};

/// Schema shape of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Trial-arm records with event counts and denominators.
    Trial,
    /// Drug-label records with pre-computed incidence percentages.
    Label,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trial => f.write_str("trial"),
            Self::Label => f.write_str("label"),
        }
    }
}

/// Physical tables produced by the ingest pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    CtgovAll,
    CtgovSerious,
    CtgovOther,
    LabelFinal,
    LabelBbw,
    LabelWap,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::CtgovAll,
        Table::CtgovSerious,
        Table::CtgovOther,
        Table::LabelFinal,
        Table::LabelBbw,
        Table::LabelWap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CtgovAll => "ctgov_all",
            Self::CtgovSerious => "ctgov_serious",
            Self::CtgovOther => "ctgov_other",
            Self::LabelFinal => "label_final",
            Self::LabelBbw => "label_bbw",
            Self::LabelWap => "label_wap",
        }
    }

    pub fn family(self) -> Family {
        match self {
            Self::CtgovAll | Self::CtgovSerious | Self::CtgovOther => Family::Trial,
            Self::LabelFinal | Self::LabelBbw | Self::LabelWap => Family::Label,
        }
    }

    /// Resolve a caller-supplied table name.
    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|t| t.name()).collect();
                QueryError::validation(format!(
                    "invalid table: {name}, must be one of {}",
                    valid.join(", ")
                ))
            })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Categorical,
    Count,
    Percentage,
}

/// One registered column.
#[derive(Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeKind,
    trial: Presence,
    label: Presence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Absent,
    Known,
    Filterable,
}

impl Attribute {
    const fn new(name: &'static str, kind: AttributeKind, trial: Presence, label: Presence) -> Self {
        Self {
            name,
            kind,
            trial,
            label,
        }
    }

    fn presence(&self, family: Family) -> Presence {
        match family {
            Family::Trial => self.trial,
            Family::Label => self.label,
        }
    }

    pub fn in_family(&self, family: Family) -> bool {
        self.presence(family) != Presence::Absent
    }

    pub fn is_filterable(&self, family: Family) -> bool {
        self.presence(family) == Presence::Filterable
    }

    /// Double-quoted identifier for generated SQL.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.name)
    }
}

use AttributeKind::{Categorical, Count, Percentage};
use Presence::{Absent, Filterable, Known};

/// Entity column used by the search term, cross-dataset and target grains.
pub const ANTIBODY: &str = "antibody";
/// Target attribute used by the target aggregation.
pub const TARGET: &str = "target_1";
/// Trial identifier column.
pub const STUDY_ID: &str = "nct_id";

static ATTRIBUTES: &[Attribute] = &[
    Attribute::new("antibody", Categorical, Filterable, Filterable),
    Attribute::new("general_molecular_category", Categorical, Filterable, Filterable),
    Attribute::new("format_general_category", Categorical, Filterable, Filterable),
    Attribute::new("isotype_fc", Categorical, Filterable, Filterable),
    Attribute::new("record_category", Categorical, Filterable, Filterable),
    Attribute::new("target_1", Categorical, Filterable, Filterable),
    Attribute::new("condition", Categorical, Filterable, Filterable),
    Attribute::new("organ_system", Categorical, Filterable, Filterable),
    Attribute::new("phase", Categorical, Filterable, Absent),
    Attribute::new("moa_new", Categorical, Filterable, Filterable),
    Attribute::new("event_type", Categorical, Filterable, Absent),
    Attribute::new("source", Categorical, Filterable, Filterable),
    Attribute::new("target_harmonized_new", Categorical, Filterable, Absent),
    Attribute::new("target_supercluster", Categorical, Filterable, Absent),
    Attribute::new("mesh_class", Categorical, Filterable, Absent),
    Attribute::new("has_comparator", Categorical, Filterable, Absent),
    Attribute::new("is_single_arm", Categorical, Filterable, Absent),
    Attribute::new("bbw", Categorical, Absent, Filterable),
    Attribute::new("wap", Categorical, Absent, Filterable),
    Attribute::new("nct_id", Categorical, Known, Absent),
    Attribute::new("adverse_event_term", Categorical, Known, Known),
    Attribute::new("events_ab", Count, Known, Absent),
    Attribute::new("n_ab", Count, Known, Absent),
    Attribute::new("events_comp", Count, Known, Absent),
    Attribute::new("n_comp", Count, Known, Absent),
    Attribute::new("all_grades_pct", Percentage, Absent, Known),
    Attribute::new("comp_all_grades_pct", Percentage, Absent, Known),
];

/// All attributes of a family, in registry order.
pub fn attributes(family: Family) -> impl Iterator<Item = &'static Attribute> {
    ATTRIBUTES.iter().filter(move |a| a.in_family(family))
}

/// Filterable attributes of a family, in registry order.
pub fn filterable(family: Family) -> impl Iterator<Item = &'static Attribute> {
    ATTRIBUTES.iter().filter(move |a| a.is_filterable(family))
}

/// Any attribute of the family (sorting, projections).
pub fn lookup(family: Family, name: &str) -> Result<&'static Attribute> {
    attributes(family)
        .find(|a| a.name == name)
        .ok_or_else(|| QueryError::validation(format!("unknown {family} attribute: {name}")))
}

/// An attribute the caller may constrain with a filter.
pub fn lookup_filterable(family: Family, name: &str) -> Result<&'static Attribute> {
    filterable(family).find(|a| a.name == name).ok_or_else(|| {
        QueryError::validation(format!("attribute not filterable for {family} data: {name}"))
    })
}

/// A categorical attribute usable as a group-by or distribution axis.
pub fn lookup_category(family: Family, name: &str) -> Result<&'static Attribute> {
    let attr = lookup(family, name)?;
    if attr.kind != Categorical {
        return Err(QueryError::validation(format!(
            "{name} is numeric and cannot be used as a category"
        )));
    }
    Ok(attr)
}

/// Static column lookup for names the engine itself references.
pub fn builtin(family: Family, name: &str) -> &'static Attribute {
    attributes(family)
        .find(|a| a.name == name)
        .expect("builtin column registered")
}
