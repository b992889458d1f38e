//! Pipeline integration tests covering the import command flow.

use super::helpers::{Workspace, related_buildings, write_feature_lines, write_utf8};
use super::*;
use crate::import::{ImportConfig, execute_import, run_import_with};
use citydb_core::ImportOptions;
use citydb_core::test_support::{building, with_address, with_address_reference};
use rstest::rstest;
use rusqlite::Connection;

fn config(workspace: &Workspace) -> ImportConfig {
    ImportConfig {
        input: workspace.input(),
        database: workspace.database(),
        options: ImportOptions::default()
            .with_threads(2)
            .with_temp_dir(workspace.cache_dir()),
    }
}

fn count(connection: &Connection, table: &str) -> i64 {
    connection
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .expect("count rows")
}

#[rstest]
fn import_creates_schema_and_resolves_references() {
    let workspace = Workspace::new();
    write_feature_lines(&workspace.input(), &related_buildings());

    let summary = execute_import(&config(&workspace)).expect("import should succeed");
    assert_eq!(summary.features, 2);
    assert_eq!(summary.resolved_references, 1);

    let connection = Connection::open(workspace.database().as_std_path()).expect("open city.db");
    assert_eq!(count(&connection, "feature"), 2);
    let (target, expected): (Option<i64>, i64) = connection
        .query_row(
            "SELECT p.val_feature_id, f.id FROM property p, feature f
             WHERE p.name = 'relatedTo' AND f.objectid = 'bldg-1'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("read resolved reference");
    assert_eq!(target, Some(expected));
    assert_eq!(
        std::fs::read_dir(workspace.cache_dir()).map(Iterator::count).unwrap_or(0),
        0,
        "reference store should be removed"
    );
}

#[rstest]
fn import_accepts_concatenated_json() {
    let workspace = Workspace::new();
    let payload: String = related_buildings()
        .iter()
        .map(|feature| serde_json::to_string(feature).expect("encode feature"))
        .collect();
    write_utf8(&workspace.input(), payload.as_bytes());

    let summary = execute_import(&config(&workspace)).expect("import should succeed");
    assert_eq!(summary.features, 2);
}

#[rstest]
fn repeated_imports_append_to_the_database() {
    let workspace = Workspace::new();
    write_feature_lines(&workspace.input(), &[with_address(building("bldg-1"), "addr-1")]);
    execute_import(&config(&workspace)).expect("first import should succeed");

    write_feature_lines(
        &workspace.input(),
        &[with_address_reference(building("bldg-2"), "#addr-1")],
    );
    let summary = execute_import(&config(&workspace)).expect("second import should succeed");
    assert_eq!(summary.features, 1);
    // Targets only live for the duration of one run.
    assert_eq!(summary.unresolved_references, 1);

    let connection = Connection::open(workspace.database().as_std_path()).expect("open city.db");
    assert_eq!(count(&connection, "feature"), 2);
    assert_eq!(count(&connection, "address"), 1);
}

#[rstest]
fn run_import_writes_summary_json() {
    let workspace = Workspace::new();
    write_feature_lines(&workspace.input(), &related_buildings());
    let args = ImportArgs {
        input: Some(workspace.input()),
        database: Some(workspace.database()),
        threads: Some(2),
        temp_dir: Some(workspace.cache_dir()),
        ..ImportArgs::default()
    };

    let mut stdout = Vec::new();
    run_import_with(args, &mut stdout).expect("import should succeed");
    let summary: serde_json::Value =
        serde_json::from_slice(&stdout).expect("summary should be JSON");
    assert_eq!(summary["features"], 2);
    assert_eq!(summary["resolved_references"], 1);
    assert_eq!(summary["unresolved_references"], 0);
}

#[rstest]
fn import_reports_the_failing_feature_index() {
    let workspace = Workspace::new();
    let mut payload = serde_json::to_string(&building("bldg-1")).expect("encode feature");
    payload.push_str("\n{\"feature_type\": 7}\n");
    write_utf8(&workspace.input(), payload.as_bytes());

    let err = execute_import(&config(&workspace)).expect_err("second feature is malformed");
    match err {
        CliError::ParseFeature { index, path, .. } => {
            assert_eq!(index, 1);
            assert_eq!(path, workspace.input());
        }
        other => panic!("expected ParseFeature, found {other:?}"),
    }
}
