use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use duckdb::Connection;
use mabdb_core::QueryError;
use mabdb_query::*;
use serde_json::json;
use tempfile::TempDir;

const CTGOV_ROWS: &str = "\
    ('mab-a', 'mAb', 'PD-1', 'Cardiac', 'Phase 3', 'NCT1', 'Arrhythmia', 10, 100, 5, 100), \
    ('mab-a', 'mAb', 'PD-1', 'Cardiac', 'Phase 3', 'NCT2', 'Palpitations', 20, 200, 10, 200), \
    ('mab-a', 'mAb', 'PD-1', 'Hepatic', 'Phase 3', 'NCT1', 'Hepatitis', 4, 100, 0, 100), \
    ('mab-b', 'ADC', 'PD-1', 'Cardiac', 'Phase 2', 'NCT3', 'Arrhythmia', 6, 50, NULL, NULL), \
    ('mab-b', 'ADC', 'PD-1', 'Skin', 'Phase 2', 'NCT3', 'Rash', 15, 50, NULL, NULL), \
    ('mab-c', 'mAb', 'HER2', 'Cardiac', 'Phase 1', 'NCT4', 'Arrhythmia', NULL, 40, NULL, NULL), \
    ('mab-c', 'mAb', 'HER2', NULL, 'Phase 1', 'NCT4', 'Nausea', 3, 40, NULL, NULL)";

const LABEL_ROWS: &str = "\
    ('mab-a', 'mAb', 'PD-1', 'Cardiac', 'No', 'Arrhythmia', 10.0, 5.0), \
    ('mab-a', 'mAb', 'PD-1', 'Cardiac', 'No', 'Palpitations', 20.0, NULL), \
    ('mab-a', 'mAb', 'PD-1', 'Cardiac', 'No', 'Edema', NULL, NULL), \
    ('mab-a', 'mAb', 'PD-1', 'Hepatic', 'No', 'Hepatitis', 5.0, 2.5), \
    ('mab-d', 'mAb', 'CD20', 'Renal', 'Yes', 'Nephritis', 8.0, NULL)";

/// Build a small store with one trial table and one label table.
fn write_store(dir: &Path) -> PathBuf {
    let path = dir.join("mab_database.duckdb");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE ctgov_all (
            antibody VARCHAR, general_molecular_category VARCHAR, target_1 VARCHAR,
            organ_system VARCHAR, phase VARCHAR, nct_id VARCHAR, adverse_event_term VARCHAR,
            events_ab INTEGER, n_ab INTEGER, events_comp INTEGER, n_comp INTEGER);
         INSERT INTO ctgov_all VALUES {CTGOV_ROWS};
         CREATE TABLE label_final (
            antibody VARCHAR, general_molecular_category VARCHAR, target_1 VARCHAR,
            organ_system VARCHAR, bbw VARCHAR, adverse_event_term VARCHAR,
            all_grades_pct DOUBLE, comp_all_grades_pct DOUBLE);
         INSERT INTO label_final VALUES {LABEL_ROWS};"
    ))
    .unwrap();
    path
}

fn setup() -> (TempDir, Engine) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();
    let store_path = write_store(dir.path());
    let engine = Engine::open(EngineConfig {
        store_path,
        ..Default::default()
    })
    .unwrap();
    (dir, engine)
}

fn filters(value: serde_json::Value) -> BTreeMap<String, serde_json::Value> {
    serde_json::from_value(value).unwrap()
}

fn ae_request(table: &str, antibody: &str) -> AdverseEventRequest {
    AdverseEventRequest {
        table: table.into(),
        group_by: "organ_system".into(),
        filters: filters(json!({"antibody": [antibody]})),
        search: None,
        top_n: 20,
    }
}

#[test]
fn test_tables_lists_present_tables() {
    let (_dir, engine) = setup();
    let tables = engine.tables().unwrap();
    assert_eq!(
        tables,
        vec![
            TableInfo {
                name: "ctgov_all".into(),
                rows: 7
            },
            TableInfo {
                name: "label_final".into(),
                rows: 5
            },
        ]
    );
}

#[test]
fn test_missing_store_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = Engine::open(EngineConfig {
        store_path: dir.path().join("nope.duckdb"),
        ..Default::default()
    })
    .err()
    .unwrap();
    assert_eq!(err.code(), "store_unavailable");
}

#[test]
fn test_trial_rates_merge_records() {
    let (_dir, engine) = setup();
    let chart = engine.adverse_events(&ae_request("ctgov_all", "mab-a")).unwrap();

    // Cardiac: (10 + 20) / (100 + 200)
    assert_eq!(chart.categories, vec!["Cardiac", "Hepatic"]);
    assert_eq!(chart.proportions, vec![10.0, 4.0]);
    assert_eq!(chart.counts, vec![30.0, 4.0]);
}

#[test]
fn test_trial_rates_skip_unusable_rows() {
    let (_dir, engine) = setup();
    let chart = engine.adverse_events(&ae_request("ctgov_all", "mab-c")).unwrap();
    // Null events and a null category leave nothing to report.
    assert!(chart.categories.is_empty());
}

#[test]
fn test_label_mean_excludes_nulls() {
    let (_dir, engine) = setup();
    let chart = engine.adverse_events(&ae_request("label_final", "mab-a")).unwrap();
    assert_eq!(chart.categories, vec!["Cardiac", "Hepatic"]);
    assert_eq!(chart.proportions, vec![15.0, 5.0]);
    assert_eq!(chart.counts, vec![2.0, 1.0]);
}

#[test]
fn test_top_n_truncates() {
    let (_dir, engine) = setup();
    let mut req = ae_request("ctgov_all", "mab-a");
    req.filters.clear();
    req.top_n = 1;
    let chart = engine.adverse_events(&req).unwrap();
    assert_eq!(chart.categories, vec!["Cardiac"]);
}

#[test]
fn test_unknown_filter_attribute_rejected() {
    let (_dir, engine) = setup();
    let mut req = ae_request("ctgov_all", "mab-a");
    req.filters = filters(json!({"evil_column": ["x"]}));
    let err = engine.adverse_events(&req).unwrap_err();
    assert!(matches!(err, QueryError::Validation(_)));

    // Label tables have no trial phase.
    let mut req = ae_request("label_final", "mab-a");
    req.filters = filters(json!({"phase": ["Phase 3"]}));
    assert!(engine.adverse_events(&req).unwrap_err().is_client_error());
}

#[test]
fn test_empty_filter_list_is_unconstrained() {
    let (_dir, engine) = setup();
    let mut req = ae_request("ctgov_all", "mab-a");
    req.filters = filters(json!({"antibody": []}));
    let unfiltered = engine.adverse_events(&req).unwrap();
    req.filters.clear();
    assert_eq!(unfiltered, engine.adverse_events(&req).unwrap());
}

#[test]
fn test_comparative_relative_risk() {
    let (_dir, engine) = setup();
    let chart = engine
        .comparative(&ComparativeRequest {
            table: "ctgov_all".into(),
            antibody: "mab-a".into(),
            nct_id: None,
            group_by: "organ_system".into(),
            filters: BTreeMap::new(),
            top_n: 15,
        })
        .unwrap();

    assert_eq!(chart.ab_arm.categories, vec!["Cardiac", "Hepatic"]);
    assert_eq!(chart.ab_arm.proportions, vec![Some(15.0), Some(4.0)]);
    assert_eq!(chart.comp_arm.proportions, vec![Some(7.5), Some(0.0)]);

    let rr = &chart.relative_risk;
    assert_eq!(rr.values[0], Some(2.0));
    let (lower, upper) = (rr.ci_lower[0].unwrap(), rr.ci_upper[0].unwrap());
    assert!(lower < 2.0 && 2.0 < upper);
    // Zero comparator events: nothing to divide by.
    assert_eq!((rr.values[1], rr.ci_lower[1], rr.ci_upper[1]), (None, None, None));
}

#[test]
fn test_comparative_single_study() {
    let (_dir, engine) = setup();
    let chart = engine
        .comparative(&ComparativeRequest {
            table: "ctgov_all".into(),
            antibody: "mab-a".into(),
            nct_id: Some("NCT2".into()),
            group_by: "organ_system".into(),
            filters: BTreeMap::new(),
            top_n: 15,
        })
        .unwrap();
    assert_eq!(chart.ab_arm.categories, vec!["Cardiac"]);
    assert_eq!(chart.ab_arm.proportions, vec![Some(10.0)]);
}

#[test]
fn test_comparative_label_is_ratio_only() {
    let (_dir, engine) = setup();
    let chart = engine
        .comparative(&ComparativeRequest {
            table: "label_final".into(),
            antibody: "mab-a".into(),
            nct_id: None,
            group_by: "organ_system".into(),
            filters: BTreeMap::new(),
            top_n: 15,
        })
        .unwrap();
    assert_eq!(chart.ab_arm.categories, vec!["Cardiac", "Hepatic"]);
    assert_eq!(chart.comp_arm.proportions, vec![Some(5.0), Some(2.5)]);
    assert_eq!(chart.relative_risk.values, vec![Some(3.0), Some(2.0)]);
    assert_eq!(chart.relative_risk.ci_lower, vec![None, None]);
}

#[test]
fn test_cross_dataset_ranks_by_larger_side() {
    let (_dir, engine) = setup();
    let chart = engine
        .cross_dataset(&CrossDatasetRequest {
            antibody: "mab-a".into(),
            group_by: "organ_system".into(),
            top_n: Some(1),
        })
        .unwrap();
    assert_eq!(chart.categories, vec!["Cardiac"]);
    assert_eq!(chart.ctgov.values, vec![Some(10.0)]);
    assert_eq!(chart.label.values, vec![Some(15.0)]);
    assert_eq!(chart.antibody, "mab-a");
}

#[test]
fn test_cross_dataset_missing_side_is_null() {
    let (_dir, engine) = setup();
    let chart = engine
        .cross_dataset(&CrossDatasetRequest {
            antibody: "mab-d".into(),
            group_by: "organ_system".into(),
            top_n: None,
        })
        .unwrap();
    assert_eq!(chart.categories, vec!["Renal"]);
    assert_eq!(chart.ctgov.values, vec![None]);
    assert_eq!(chart.label.values, vec![Some(8.0)]);
}

#[test]
fn test_cross_dataset_without_top_n_keeps_every_category() {
    let _ = env_logger::builder().is_test(true).try_init();
    let conn = Connection::open_in_memory().unwrap();
    let rows: Vec<String> = (0..20)
        .map(|i| format!("('mab-a', 'Organ {i:02}', {}, 100)", i + 1))
        .collect();
    conn.execute_batch(&format!(
        "CREATE TABLE ctgov_all (antibody VARCHAR, organ_system VARCHAR, events_ab INTEGER, n_ab INTEGER);
         INSERT INTO ctgov_all VALUES {};
         CREATE TABLE label_final (antibody VARCHAR, organ_system VARCHAR, all_grades_pct DOUBLE);
         INSERT INTO label_final VALUES ('mab-a', 'Organ 00', 50.0);",
        rows.join(", ")
    ))
    .unwrap();
    let engine = Engine::from_connection(conn, EngineConfig::default());

    let req: CrossDatasetRequest = serde_json::from_value(json!({"antibody": "mab-a"})).unwrap();
    let chart = engine.cross_dataset(&req).unwrap();
    assert_eq!(chart.categories.len(), 20);
    assert_eq!(chart.categories[0], "Organ 00");
    assert_eq!(chart.categories[1], "Organ 19");

    let req = CrossDatasetRequest {
        top_n: Some(0),
        ..req
    };
    assert_eq!(engine.cross_dataset(&req).unwrap().categories.len(), 20);
}

#[test]
fn test_target_aggregation_spread() {
    let (_dir, engine) = setup();
    let agg = engine
        .target_aggregation(&TargetRequest {
            table: "ctgov_all".into(),
            target: "PD-1".into(),
            group_by: "organ_system".into(),
            filters: BTreeMap::new(),
            top_n: 15,
        })
        .unwrap();

    let categories: Vec<&str> = agg.data.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(categories, vec!["Skin", "Cardiac", "Hepatic"]);
    for row in &agg.data {
        assert!(row.min <= row.mean && row.mean <= row.max, "{row:?}");
    }
    // mab-a 10.0, mab-b 12.0
    let cardiac = &agg.data[1];
    assert_eq!((cardiac.mean, cardiac.min, cardiac.max, cardiac.count), (11.0, 10.0, 12.0, 2));
}

#[test]
fn test_query_pages_cover_total() {
    let (_dir, engine) = setup();
    let mut req: QueryRequest = serde_json::from_value(json!({
        "table": "ctgov_all",
        "page_size": 3,
        "sort_by": "events_ab",
        "sort_dir": "desc"
    }))
    .unwrap();

    let first = engine.query(&req).unwrap();
    assert_eq!(first.total, 7);
    assert_eq!(first.data[0]["events_ab"], json!(20));

    let mut seen = first.data.len();
    for page in 2..=3 {
        req.page = page;
        seen += engine.query(&req).unwrap().data.len();
    }
    assert_eq!(seen as u64, first.total);

    req.page = 4;
    assert!(engine.query(&req).unwrap().data.is_empty());
}

#[test]
fn test_query_rejects_bad_paging() {
    let (_dir, engine) = setup();
    let mut req: QueryRequest = serde_json::from_value(json!({})).unwrap();
    req.page = 0;
    assert!(matches!(engine.query(&req), Err(QueryError::Validation(_))));
    req.page = 1;
    req.page_size = 5000;
    assert!(matches!(engine.query(&req), Err(QueryError::Validation(_))));
    // Offset past i64 range
    req.page = i64::MAX;
    req.page_size = 50;
    assert!(matches!(engine.query(&req), Err(QueryError::Validation(_))));
}

#[test]
fn test_search_is_case_insensitive_and_literal() {
    let (_dir, engine) = setup();
    let mut req: QueryRequest =
        serde_json::from_value(json!({"table": "ctgov_all", "search": "MAB-B"})).unwrap();
    assert_eq!(engine.query(&req).unwrap().total, 2);

    req.search = Some("%".into());
    assert_eq!(engine.query(&req).unwrap().total, 0);
}

#[test]
fn test_distribution_counts() {
    let (_dir, engine) = setup();
    let dist = engine
        .distribution(&serde_json::from_value(json!({"table": "ctgov_all"})).unwrap())
        .unwrap();
    assert_eq!(dist.labels, vec!["mAb", "ADC"]);
    assert_eq!(dist.values, vec![5, 2]);
}

#[test]
fn test_filter_options_missing_column_is_empty() {
    let (_dir, engine) = setup();
    let options = engine.filter_options("label_final").unwrap();
    assert_eq!(options["organ_system"], vec![json!("Cardiac"), json!("Hepatic"), json!("Renal")]);
    assert!(options["format_general_category"].is_empty());
    assert!(!options.contains_key("phase"));
}

#[test]
fn test_lookups() {
    let (_dir, engine) = setup();
    assert_eq!(engine.overlapping_antibodies().unwrap(), vec!["mab-a"]);
    assert_eq!(engine.targets("label_final").unwrap(), vec!["CD20", "PD-1"]);
    assert_eq!(engine.antibodies_with_comparator("ctgov_all").unwrap(), vec!["mab-a"]);
    assert_eq!(engine.antibodies_with_comparator("label_final").unwrap(), vec!["mab-a"]);
    assert_eq!(engine.studies("ctgov_all", Some("mab-b")).unwrap(), vec!["NCT3"]);
    assert_eq!(engine.studies("ctgov_all", None).unwrap().len(), 4);
    assert!(engine.studies("label_final", None).unwrap().is_empty());
}

#[test]
fn test_export_requires_matches() {
    let (_dir, engine) = setup();
    let req: ExportRequest = serde_json::from_value(json!({
        "table": "label_final",
        "filters": {"bbw": ["Yes"]}
    }))
    .unwrap();
    let export = engine.export(&req).unwrap();
    assert_eq!(export.columns[0], "antibody");
    assert_eq!(export.rows.len(), 1);

    let req: ExportRequest = serde_json::from_value(json!({
        "table": "label_final",
        "filters": {"antibody": ["mab-z"]}
    }))
    .unwrap();
    assert!(matches!(engine.export(&req), Err(QueryError::NotFound(_))));
}

#[test]
fn test_cloned_handle_queries_from_another_thread() {
    let (_dir, engine) = setup();
    let handle = engine.try_clone().unwrap();
    let tables = std::thread::spawn(move || handle.tables().unwrap().len())
        .join()
        .unwrap();
    assert_eq!(tables, 2);
}
