//! SQL generation for the query engine.
//!
//! Identifiers come from the schema registry and are always quoted;
//! values only ever appear as `?` placeholders bound from a [`Predicate`].
//! Numeric columns go through `TRY_CAST` because the ingest pipeline keeps
//! whatever type the spreadsheet cell had.

use mabdb_core::{Attribute, Family, Predicate, Table};

/// How one family's records contribute to a group's partial totals.
pub struct Measure {
    pub numerator: &'static str,
    pub denominator: &'static str,
    /// Rows failing this never enter a group.
    pub validity: &'static str,
}

pub fn measure(family: Family) -> Measure {
    match family {
        Family::Trial => Measure {
            numerator: "SUM(TRY_CAST(\"events_ab\" AS DOUBLE))",
            denominator: "SUM(TRY_CAST(\"n_ab\" AS DOUBLE))",
            validity: "TRY_CAST(\"events_ab\" AS DOUBLE) IS NOT NULL \
                       AND TRY_CAST(\"n_ab\" AS DOUBLE) > 0",
        },
        Family::Label => Measure {
            numerator: "SUM(TRY_CAST(\"all_grades_pct\" AS DOUBLE))",
            denominator: "CAST(COUNT(TRY_CAST(\"all_grades_pct\" AS DOUBLE)) AS DOUBLE)",
            validity: "TRY_CAST(\"all_grades_pct\" AS DOUBLE) IS NOT NULL",
        },
    }
}

pub fn not_null(attr: &Attribute) -> String {
    format!("{} IS NOT NULL", attr.quoted())
}

fn limit_clause(top_n: usize) -> &'static str {
    if top_n > 0 { " LIMIT ?" } else { "" }
}

/// Row count of a filtered table.
pub fn count(table: Table, pred: &Predicate) -> String {
    format!("SELECT COUNT(*) FROM {table}{}", pred.where_sql())
}

/// One page of raw records. `rowid` keeps pages stable when the sort
/// column has duplicates (or there is no sort column at all).
pub fn page(table: Table, pred: &Predicate, order: Option<(&Attribute, bool)>) -> String {
    let order_by = match order {
        Some((attr, true)) => format!("{} DESC NULLS LAST, rowid", attr.quoted()),
        Some((attr, false)) => format!("{} ASC NULLS LAST, rowid", attr.quoted()),
        None => "rowid".to_string(),
    };
    format!(
        "SELECT * FROM {table}{} ORDER BY {order_by} LIMIT ? OFFSET ?",
        pred.where_sql()
    )
}

/// All matching records in store order, for export.
pub fn export(table: Table, pred: &Predicate) -> String {
    format!("SELECT * FROM {table}{} ORDER BY rowid", pred.where_sql())
}

/// Record count per distinct value of `column`.
pub fn distribution(table: Table, column: &Attribute, pred: &Predicate) -> String {
    format!(
        "SELECT CAST({col} AS VARCHAR) AS label, COUNT(*) AS cnt
         FROM {table}{where_sql}
         GROUP BY 1
         ORDER BY cnt DESC, label",
        col = column.quoted(),
        where_sql = pred.where_sql(),
    )
}

/// Partial totals per category, or per (category, entity) when `entity`
/// is given. Columns: category, entity (or NULL), numerator, denominator,
/// record count. Rows come back ordered by key.
pub fn grouped_totals(
    table: Table,
    family: Family,
    category: &Attribute,
    entity: Option<&Attribute>,
    pred: &Predicate,
) -> String {
    let m = measure(family);
    let (entity_col, group_by) = match entity {
        Some(e) => (format!("CAST({} AS VARCHAR)", e.quoted()), "1, 2"),
        None => ("NULL::VARCHAR".to_string(), "1"),
    };
    format!(
        "SELECT CAST({cat} AS VARCHAR) AS category,
                {entity_col} AS entity,
                {num} AS numerator,
                {den} AS denominator,
                COUNT(*) AS records
         FROM {table}{where_sql}
         GROUP BY {group_by}
         ORDER BY {group_by}",
        cat = category.quoted(),
        num = m.numerator,
        den = m.denominator,
        where_sql = pred.where_sql(),
    )
}

/// Exposed vs comparator arm totals per category, ranked by exposed-arm
/// magnitude. Trial arms sum events and take the largest arm size, since
/// every adverse-event row of a trial repeats the same denominator.
pub fn comparative(
    table: Table,
    family: Family,
    category: &Attribute,
    pred: &Predicate,
    top_n: usize,
) -> String {
    let aggregates = match family {
        Family::Trial => {
            "SUM(TRY_CAST(\"events_ab\" AS DOUBLE)) AS ab_events,
                MAX(TRY_CAST(\"n_ab\" AS DOUBLE)) AS ab_n,
                SUM(TRY_CAST(\"events_comp\" AS DOUBLE)) AS comp_events,
                MAX(TRY_CAST(\"n_comp\" AS DOUBLE)) AS comp_n"
        }
        Family::Label => {
            "AVG(TRY_CAST(\"all_grades_pct\" AS DOUBLE)) AS ab_pct,
                AVG(TRY_CAST(\"comp_all_grades_pct\" AS DOUBLE)) AS comp_pct"
        }
    };
    format!(
        "SELECT CAST({cat} AS VARCHAR) AS category,
                {aggregates}
         FROM {table}{where_sql}
         GROUP BY 1
         ORDER BY 2 DESC NULLS LAST, 1{limit}",
        cat = category.quoted(),
        where_sql = pred.where_sql(),
        limit = limit_clause(top_n),
    )
}

/// Comparative rows require a usable exposed-arm denominator (trial only).
pub fn comparative_validity(family: Family) -> Option<&'static str> {
    match family {
        Family::Trial => Some("TRY_CAST(\"n_ab\" AS DOUBLE) > 0"),
        Family::Label => None,
    }
}

/// Sorted distinct non-null values of a column, in their stored type.
pub fn distinct_values(table: Table, column: &Attribute) -> String {
    let col = column.quoted();
    format!("SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL ORDER BY {col}")
}

/// Sorted distinct values of a column as text.
pub fn distinct_text(table: Table, column: &Attribute, pred: &Predicate) -> String {
    format!(
        "SELECT DISTINCT CAST({} AS VARCHAR) AS v FROM {table}{} ORDER BY v",
        column.quoted(),
        pred.where_sql(),
    )
}

/// Antibodies present in both tables.
pub fn overlapping_antibodies(trial: Table, label: Table) -> String {
    format!(
        "SELECT antibody FROM (
           SELECT DISTINCT CAST(\"antibody\" AS VARCHAR) AS antibody
           FROM {trial} WHERE \"antibody\" IS NOT NULL
           INTERSECT
           SELECT DISTINCT CAST(\"antibody\" AS VARCHAR) AS antibody
           FROM {label} WHERE \"antibody\" IS NOT NULL
         ) ORDER BY antibody"
    )
}

/// Condition selecting records that carry comparator data.
pub fn has_comparator(family: Family) -> &'static str {
    match family {
        Family::Trial => "TRY_CAST(\"n_comp\" AS DOUBLE) > 0",
        Family::Label => "TRY_CAST(\"comp_all_grades_pct\" AS DOUBLE) IS NOT NULL",
    }
}

/// Whether a table exists in the main schema.
pub fn table_exists() -> &'static str {
    "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?"
}

/// Physical column names of a table.
pub fn table_columns() -> &'static str {
    "SELECT column_name FROM information_schema.columns WHERE table_name = ?"
}

#[cfg(test)]
mod tests {
    use super::*;
    use mabdb_core::{FilterSpec, schema};

    #[test]
    fn grouped_totals_at_category_grain() {
        let cat = schema::lookup_category(Family::Trial, "organ_system").unwrap();
        let sql = grouped_totals(
            Table::CtgovAll,
            Family::Trial,
            cat,
            None,
            &FilterSpec::new(Family::Trial).predicate().and(not_null(cat)),
        );
        assert!(sql.contains("FROM ctgov_all WHERE \"organ_system\" IS NOT NULL"));
        assert!(sql.contains("NULL::VARCHAR AS entity"));
        assert!(sql.contains("GROUP BY 1\n"));
    }

    #[test]
    fn grouped_totals_at_entity_grain() {
        let cat = schema::lookup_category(Family::Label, "organ_system").unwrap();
        let ab = schema::builtin(Family::Label, schema::ANTIBODY);
        let sql = grouped_totals(
            Table::LabelFinal,
            Family::Label,
            cat,
            Some(ab),
            &FilterSpec::new(Family::Label).predicate(),
        );
        assert!(sql.contains("CAST(\"antibody\" AS VARCHAR) AS entity"));
        assert!(sql.contains("GROUP BY 1, 2"));
        assert!(sql.contains("all_grades_pct"));
    }

    #[test]
    fn page_orders_by_rowid_last() {
        let attr = schema::lookup(Family::Trial, "n_ab").unwrap();
        let pred = FilterSpec::new(Family::Trial).predicate();
        assert_eq!(
            page(Table::CtgovAll, &pred, Some((attr, true))),
            "SELECT * FROM ctgov_all ORDER BY \"n_ab\" DESC NULLS LAST, rowid LIMIT ? OFFSET ?"
        );
        assert!(page(Table::CtgovAll, &pred, None).ends_with("ORDER BY rowid LIMIT ? OFFSET ?"));
    }

    #[test]
    fn comparative_limit_only_when_bounded() {
        let cat = schema::lookup_category(Family::Trial, "organ_system").unwrap();
        let pred = FilterSpec::new(Family::Trial).predicate();
        assert!(comparative(Table::CtgovAll, Family::Trial, cat, &pred, 5).ends_with("LIMIT ?"));
        assert!(!comparative(Table::CtgovAll, Family::Trial, cat, &pred, 0).contains("LIMIT"));
    }
}
