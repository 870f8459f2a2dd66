//! mabdb-query: DuckDB-backed query engine over the antibody safety store
//!
//! Validates every request against the schema registry before touching the
//! store, runs parameterised SQL, and reduces the grouped rows with
//! `mabdb-core`. The store is opened read-only and never written.

pub mod api;
mod config;
mod rows;
mod sql;

pub use api::*;
pub use config::EngineConfig;

use std::collections::{BTreeMap, BTreeSet};

use duckdb::types::Value;
use duckdb::{AccessMode, Connection, Row, params_from_iter};
use mabdb_core::{
    ArmCounts, Attribute, CategorySeries, Family, FilterSpec, GroupTotals, Param, QueryError,
    RelativeRisk, Result, RiskSeries, Table, aggregate, merge, reduce_targets, round_to, schema,
};

/// Read-only handle on the store.
///
/// A `Connection` is not `Sync`: give each worker its own handle via
/// [`Engine::try_clone`]. Handles share the underlying database.
pub struct Engine {
    conn: Connection,
    config: EngineConfig,
}

impl Engine {
    /// Open the store read-only.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let path = config.store_path.display().to_string();
        if !config.store_path.exists() {
            return Err(QueryError::StoreUnavailable(format!(
                "store not found at {path}, run the ingest pipeline first"
            )));
        }
        let unavailable = |e: duckdb::Error| QueryError::StoreUnavailable(format!("{path}: {e}"));

        let mut db_config = duckdb::Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(unavailable)?;
        if let Some(limit) = &config.memory_limit {
            db_config = db_config.max_memory(limit).map_err(unavailable)?;
        }
        if let Some(threads) = config.threads {
            db_config = db_config.threads(threads).map_err(unavailable)?;
        }
        let conn = Connection::open_with_flags(&config.store_path, db_config).map_err(unavailable)?;

        log::info!("Opened store {path} (read-only)");
        Ok(Self { conn, config })
    }

    /// Wrap an existing connection (in-memory stores, embedding).
    pub fn from_connection(conn: Connection, config: EngineConfig) -> Self {
        Self { conn, config }
    }

    /// Another handle on the same database, for use from another thread.
    pub fn try_clone(&self) -> Result<Self> {
        let conn = self
            .conn
            .try_clone()
            .map_err(|e| QueryError::StoreUnavailable(e.to_string()))?;
        Ok(Self {
            conn,
            config: self.config.clone(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Store access ──

    fn fetch<T, F>(&self, context: &str, sql: &str, params: &[Param], f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> duckdb::Result<T>,
    {
        log::debug!("{context}: {}", sql.split_whitespace().collect::<Vec<_>>().join(" "));
        let store_err = |e: duckdb::Error| QueryError::store(context, e);
        let mut stmt = self.conn.prepare(sql).map_err(store_err)?;
        let mapped = stmt
            .query_map(params_from_iter(params.iter().map(rows::to_sql)), f)
            .map_err(store_err)?;
        mapped.collect::<duckdb::Result<Vec<T>>>().map_err(store_err)
    }

    fn fetch_count(&self, context: &str, sql: &str, params: &[Param]) -> Result<u64> {
        let counts = self.fetch(context, sql, params, |row| row.get::<_, i64>(0))?;
        Ok(counts.first().copied().unwrap_or(0).max(0) as u64)
    }

    fn fetch_text(&self, context: &str, sql: &str, params: &[Param]) -> Result<Vec<String>> {
        self.fetch(context, sql, params, |row| row.get::<_, String>(0))
    }

    /// Column names and JSON cells of an arbitrary projection.
    fn fetch_records(
        &self,
        context: &str,
        sql: &str,
        params: &[Param],
    ) -> Result<(Vec<String>, Vec<Vec<serde_json::Value>>)> {
        log::debug!("{context}: {sql}");
        let store_err = |e: duckdb::Error| QueryError::store(context, e);
        let mut stmt = self.conn.prepare(sql).map_err(store_err)?;
        let mut cursor = stmt
            .query(params_from_iter(params.iter().map(rows::to_sql)))
            .map_err(store_err)?;
        let columns = cursor
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut records = Vec::new();
        while let Some(row) = cursor.next().map_err(store_err)? {
            let cells = (0..columns.len())
                .map(|i| row.get::<_, Value>(i).map(rows::to_json))
                .collect::<duckdb::Result<Vec<_>>>()
                .map_err(store_err)?;
            records.push(cells);
        }
        Ok((columns, records))
    }

    fn table_exists(&self, table: Table) -> Result<bool> {
        let n = self.fetch_count("table lookup", sql::table_exists(), &[table.name().into()])?;
        Ok(n > 0)
    }

    fn table_columns(&self, table: Table) -> Result<BTreeSet<String>> {
        let cols = self.fetch_text("column lookup", sql::table_columns(), &[table.name().into()])?;
        Ok(cols.into_iter().collect())
    }

    fn grouped_totals(
        &self,
        table: Table,
        category: &Attribute,
        entity: Option<&Attribute>,
        spec: &FilterSpec,
    ) -> Result<Vec<GroupTotals>> {
        let family = spec.family();
        let mut pred = spec
            .predicate()
            .and(sql::not_null(category))
            .and(sql::measure(family).validity);
        if let Some(e) = entity {
            pred = pred.and(sql::not_null(e));
        }
        let sql = sql::grouped_totals(table, family, category, entity, &pred);
        self.fetch("aggregation", &sql, pred.params(), |row| {
            Ok(GroupTotals {
                category: row.get(0)?,
                entity: row.get(1)?,
                numerator: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                denominator: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                records: row.get::<_, i64>(4)?.max(0) as u64,
            })
        })
    }

    // ── Operations ──

    /// Known tables present in the store, with their row counts.
    pub fn tables(&self) -> Result<Vec<TableInfo>> {
        let mut out = Vec::new();
        for table in Table::ALL {
            if !self.table_exists(table)? {
                log::debug!("Table {table} not in store, skipping");
                continue;
            }
            let rows = self.fetch_count("table count", &format!("SELECT COUNT(*) FROM {table}"), &[])?;
            out.push(TableInfo {
                name: table.name().to_string(),
                rows,
            });
        }
        Ok(out)
    }

    /// Distinct values of every filterable attribute of the table's family.
    /// Attributes the physical table lacks yield an empty list.
    pub fn filter_options(&self, table: &str) -> Result<BTreeMap<String, Vec<serde_json::Value>>> {
        let table = Table::parse(table)?;
        let present = self.table_columns(table)?;
        let mut out = BTreeMap::new();
        for attr in schema::filterable(table.family()) {
            let values = if present.contains(attr.name) {
                self.fetch_records("filter options", &sql::distinct_values(table, attr), &[])?
                    .1
                    .into_iter()
                    .filter_map(|mut cells| cells.pop())
                    .collect()
            } else {
                log::warn!("Column {} missing from {table}, no filter options", attr.name);
                Vec::new()
            };
            out.insert(attr.name.to_string(), values);
        }
        Ok(out)
    }

    /// One page of filtered records plus the total match count.
    pub fn query(&self, req: &QueryRequest) -> Result<QueryPage> {
        let table = Table::parse(&req.table)?;
        let family = table.family();
        let spec = FilterSpec::parse(family, &req.filters, req.search.as_deref())?;
        if req.page < 1 {
            return Err(QueryError::validation(format!("page must be >= 1, got {}", req.page)));
        }
        if req.page_size < 1 || req.page_size as u64 > self.config.max_page_size {
            return Err(QueryError::validation(format!(
                "page_size must be between 1 and {}, got {}",
                self.config.max_page_size, req.page_size
            )));
        }
        let order = req
            .sort_by
            .as_deref()
            .map(|name| schema::lookup(family, name))
            .transpose()?
            .map(|attr| (attr, req.sort_dir == SortDir::Desc));

        let pred = spec.predicate();
        let total = self.fetch_count("count", &sql::count(table, &pred), pred.params())?;

        let offset = (req.page - 1)
            .checked_mul(req.page_size)
            .ok_or_else(|| QueryError::validation(format!("page out of range: {}", req.page)))?;
        let mut params = pred.params().to_vec();
        params.push(Param::Integer(req.page_size));
        params.push(Param::Integer(offset));
        let (columns, records) =
            self.fetch_records("page", &sql::page(table, &pred, order), &params)?;
        let data = records
            .into_iter()
            .map(|cells| columns.iter().cloned().zip(cells).collect())
            .collect();

        Ok(QueryPage {
            data,
            total,
            page: req.page as u64,
            page_size: req.page_size as u64,
        })
    }

    /// Record count per distinct value of a categorical column.
    pub fn distribution(&self, req: &DistributionRequest) -> Result<Distribution> {
        let table = Table::parse(&req.table)?;
        let family = table.family();
        let column = schema::lookup_category(family, &req.column)?;
        let spec = FilterSpec::parse(family, &req.filters, req.search.as_deref())?;

        let pred = spec.predicate().and(sql::not_null(column));
        let rows = self.fetch(
            "distribution",
            &sql::distribution(table, column, &pred),
            pred.params(),
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )?;
        let (labels, values) = rows.into_iter().unzip();
        Ok(Distribution { labels, values })
    }

    /// Adverse-event rate (trial) or mean incidence (label) per category.
    pub fn adverse_events(&self, req: &AdverseEventRequest) -> Result<AdverseEventChart> {
        let table = Table::parse(&req.table)?;
        let family = table.family();
        let category = schema::lookup_category(family, &req.group_by)?;
        let spec = FilterSpec::parse(family, &req.filters, req.search.as_deref())?;

        let groups = self.grouped_totals(table, category, None, &spec)?;
        log::debug!("adverse events: {} groups before reduction", groups.len());
        Ok(CategorySeries::from(aggregate::reduce(
            family, groups, req.top_n,
        )))
    }

    /// Treatment arm against comparator arm for one antibody, with relative
    /// risk per category.
    pub fn comparative(&self, req: &ComparativeRequest) -> Result<ComparativeChart> {
        let table = Table::parse(&req.table)?;
        let family = table.family();
        let category = schema::lookup_category(family, &req.group_by)?;
        if req.antibody.is_empty() {
            return Err(QueryError::validation("antibody is required"));
        }
        let mut spec = FilterSpec::parse(family, &req.filters, None)?;
        spec.require(schema::builtin(family, schema::ANTIBODY), req.antibody.as_str().into());
        match (&req.nct_id, family) {
            (Some(nct), Family::Trial) if !nct.is_empty() => {
                spec.require(schema::builtin(family, schema::STUDY_ID), nct.as_str().into());
            }
            (Some(_), Family::Label) => log::debug!("nct_id ignored for label table {table}"),
            _ => {}
        }

        let mut pred = spec.predicate().and(sql::not_null(category));
        if let Some(validity) = sql::comparative_validity(family) {
            pred = pred.and(validity);
        }
        let mut params = pred.params().to_vec();
        if req.top_n > 0 {
            params.push(Param::Integer(req.top_n as i64));
        }
        let sql = sql::comparative(table, family, category, &pred, req.top_n);

        let mut chart = ComparativeChart::default();
        let mut risks = Vec::new();
        match family {
            Family::Trial => {
                let rows = self.fetch("comparative", &sql, &params, |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        ArmCounts {
                            events: row.get(1)?,
                            denominator: row.get(2)?,
                        },
                        ArmCounts {
                            events: row.get(3)?,
                            denominator: row.get(4)?,
                        },
                    ))
                })?;
                for (category, exposed, comparator) in rows {
                    chart.ab_arm.proportions.push(exposed.proportion());
                    chart.comp_arm.proportions.push(comparator.proportion());
                    risks.push(RelativeRisk::compute(exposed, comparator));
                    chart.ab_arm.categories.push(category.clone());
                    chart.comp_arm.categories.push(category);
                }
            }
            Family::Label => {
                let rows = self.fetch("comparative", &sql, &params, |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                    ))
                })?;
                for (category, exposed, comparator) in rows {
                    chart.ab_arm.proportions.push(exposed.map(|p| round_to(p, 2)));
                    chart.comp_arm.proportions.push(comparator.map(|p| round_to(p, 2)));
                    risks.push(RelativeRisk::from_percentages(exposed, comparator));
                    chart.ab_arm.categories.push(category.clone());
                    chart.comp_arm.categories.push(category);
                }
            }
        }
        chart.relative_risk = risks.into_iter().collect::<RiskSeries>();
        Ok(chart)
    }

    /// Trial exposed-arm rates against label incidences for one antibody.
    pub fn cross_dataset(&self, req: &CrossDatasetRequest) -> Result<CrossDatasetChart> {
        if req.antibody.is_empty() {
            return Err(QueryError::validation("antibody is required"));
        }
        let trial_table = self.config.cross_trial_table;
        let label_table = self.config.cross_label_table;
        let trial_category = schema::lookup_category(Family::Trial, &req.group_by)?;
        let label_category = schema::lookup_category(Family::Label, &req.group_by)?;

        let per_family = |table: Table, category: &Attribute| -> Result<merge::CategoryValues> {
            let family = table.family();
            let mut spec = FilterSpec::new(family);
            spec.require(schema::builtin(family, schema::ANTIBODY), req.antibody.as_str().into());
            let groups = self.grouped_totals(table, category, None, &spec)?;
            Ok(merge::category_values(&aggregate::reduce(family, groups, 0)))
        };
        let trial = per_family(trial_table, trial_category)?;
        let label = per_family(label_table, label_category)?;
        log::debug!(
            "cross dataset {}: {} trial / {} label categories",
            req.antibody,
            trial.len(),
            label.len()
        );

        let mut chart = CrossDatasetChart {
            antibody: req.antibody.clone(),
            ..Default::default()
        };
        for row in merge::merge(&trial, &label, req.top_n.unwrap_or(0)) {
            chart.categories.push(row.category);
            chart.ctgov.values.push(row.trial);
            chart.label.values.push(row.label);
        }
        Ok(chart)
    }

    /// Spread of per-antibody rates across antibodies sharing a target.
    pub fn target_aggregation(&self, req: &TargetRequest) -> Result<TargetAggregation> {
        let table = Table::parse(&req.table)?;
        let family = table.family();
        let category = schema::lookup_category(family, &req.group_by)?;
        if req.target.is_empty() {
            return Err(QueryError::validation("target is required"));
        }
        let mut spec = FilterSpec::parse(family, &req.filters, None)?;
        spec.require(schema::builtin(family, schema::TARGET), req.target.as_str().into());

        let antibody = schema::builtin(family, schema::ANTIBODY);
        let groups = self.grouped_totals(table, category, Some(antibody), &spec)?;
        Ok(TargetAggregation {
            target: req.target.clone(),
            data: reduce_targets(family, groups, req.top_n),
        })
    }

    /// Trial identifiers of a table, optionally for antibodies matching a
    /// substring. Label tables carry no trials.
    pub fn studies(&self, table: &str, antibody: Option<&str>) -> Result<Vec<String>> {
        let table = Table::parse(table)?;
        if table.family() != Family::Trial {
            return Ok(Vec::new());
        }
        let study = schema::builtin(Family::Trial, schema::STUDY_ID);
        let mut spec = FilterSpec::new(Family::Trial);
        if let Some(term) = antibody {
            spec.search(term);
        }
        let pred = spec.predicate().and(sql::not_null(study));
        self.fetch_text("studies", &sql::distinct_text(table, study, &pred), pred.params())
    }

    /// Antibodies with records in both cross-dataset tables.
    pub fn overlapping_antibodies(&self) -> Result<Vec<String>> {
        let sql =
            sql::overlapping_antibodies(self.config.cross_trial_table, self.config.cross_label_table);
        self.fetch_text("overlapping antibodies", &sql, &[])
    }

    /// Distinct targets of a table.
    pub fn targets(&self, table: &str) -> Result<Vec<String>> {
        let table = Table::parse(table)?;
        let target = schema::builtin(table.family(), schema::TARGET);
        let pred = FilterSpec::new(table.family())
            .predicate()
            .and(sql::not_null(target));
        self.fetch_text("targets", &sql::distinct_text(table, target, &pred), pred.params())
    }

    /// Antibodies with comparator-arm data in a table.
    pub fn antibodies_with_comparator(&self, table: &str) -> Result<Vec<String>> {
        let table = Table::parse(table)?;
        let family = table.family();
        let antibody = schema::builtin(family, schema::ANTIBODY);
        let pred = FilterSpec::new(family)
            .predicate()
            .and(sql::not_null(antibody))
            .and(sql::has_comparator(family));
        self.fetch_text(
            "antibodies with comparator",
            &sql::distinct_text(table, antibody, &pred),
            pred.params(),
        )
    }

    /// Every matching record, for export. An empty match is an error here.
    pub fn export(&self, req: &ExportRequest) -> Result<ExportRows> {
        let table = Table::parse(&req.table)?;
        let spec = FilterSpec::parse(table.family(), &req.filters, req.search.as_deref())?;
        let pred = spec.predicate();
        let (columns, rows) = self.fetch_records("export", &sql::export(table, &pred), pred.params())?;
        if rows.is_empty() {
            return Err(QueryError::NotFound("no data matching filters".into()));
        }
        log::info!("Exporting {} rows from {table}", rows.len());
        Ok(ExportRows {
            table: table.name().to_string(),
            columns,
            rows,
        })
    }
}
