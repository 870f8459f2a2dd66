//! Filter specifications and the parameterised predicates built from them
//!
//! An attribute mapped to an empty value list is unconstrained: it behaves
//! exactly like an absent attribute and does NOT match nothing. Callers
//! clearing a filter widget rely on this, keep it that way.

use std::collections::BTreeMap;

use crate::error::{QueryError, Result};
use crate::schema::{self, Attribute, Family};

/// Caller-supplied filter mapping, as decoded from a request body.
pub type RawFilters = BTreeMap<String, serde_json::Value>;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Param {
    fn from_json(attr: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| QueryError::validation(format!("{attr}: unsupported number {n}"))),
            other => Err(QueryError::validation(format!(
                "{attr}: filter values must be scalars, got {other}"
            ))),
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Conjunction of SQL conditions plus their bound parameters, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<String>,
    params: Vec<Param>,
}

impl Predicate {
    /// Append a condition that binds no parameters.
    pub fn and(mut self, clause: impl Into<String>) -> Self {
        self.clauses.push(clause.into());
        self
    }

    /// `" WHERE a AND b"`, or the empty string when unconstrained.
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Validated filter specification for one dataset family.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    family: Family,
    constraints: Vec<(&'static Attribute, Vec<Param>)>,
    search: Option<String>,
}

impl FilterSpec {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            constraints: Vec::new(),
            search: None,
        }
    }

    /// Validate a raw mapping against the family's allow-list.
    ///
    /// Every key is checked, including keys with empty lists, so a request
    /// naming an unknown column fails even when it would not constrain.
    pub fn parse(family: Family, raw: &RawFilters, search: Option<&str>) -> Result<Self> {
        let mut spec = Self::new(family);
        for (name, values) in raw {
            let values = match values {
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|v| Param::from_json(name, v))
                    .collect::<Result<Vec<_>>>()?,
                serde_json::Value::Null => Vec::new(),
                other => {
                    return Err(QueryError::validation(format!(
                        "{name}: expected a list of values, got {other}"
                    )));
                }
            };
            spec.constrain(name, values)?;
        }
        if let Some(term) = search {
            spec.search(term);
        }
        Ok(spec)
    }

    /// Restrict a filterable attribute to a set of values.
    pub fn constrain(&mut self, name: &str, values: Vec<Param>) -> Result<()> {
        let attr = schema::lookup_filterable(self.family, name)?;
        self.constraints.push((attr, values));
        Ok(())
    }

    /// Equality constraint on an engine-chosen column, bypassing the
    /// caller allow-list (study ids, target grain).
    pub fn require(&mut self, attr: &'static Attribute, value: Param) {
        self.constraints.push((attr, vec![value]));
    }

    /// Case-insensitive substring match on the antibody name.
    pub fn search(&mut self, term: &str) {
        self.search = (!term.is_empty()).then(|| term.to_string());
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn predicate(&self) -> Predicate {
        let mut pred = Predicate::default();
        for (attr, values) in &self.constraints {
            if values.is_empty() {
                continue;
            }
            let placeholders = vec!["?"; values.len()].join(", ");
            pred.clauses
                .push(format!("{} IN ({placeholders})", attr.quoted()));
            pred.params.extend(values.iter().cloned());
        }
        if let Some(term) = &self.search {
            let antibody = schema::builtin(self.family, schema::ANTIBODY);
            pred.clauses
                .push(format!("{} ILIKE ? ESCAPE '\\'", antibody.quoted()));
            pred.params.push(Param::Text(like_pattern(term)));
        }
        pred
    }
}

/// `%term%` with LIKE metacharacters in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}
