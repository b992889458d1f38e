//! Behaviour-driven step definitions driving the import CLI scenarios.

use super::helpers::{Workspace, related_buildings, write_feature_lines, write_utf8};
use super::*;
use crate::import::run_import_with;
use citydb_core::test_support::{building, related_to};
use citydb_data::{ImportError, ImportSummary, ReferenceError};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

/// Aggregates import CLI scenario state behind a single world argument.
#[derive(Debug)]
struct ImportWorld {
    workspace: Workspace,
    include_database: RefCell<bool>,
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl ImportWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            include_database: RefCell::new(false),
            cli_args: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn build_command_line(&self) -> Vec<String> {
        let workspace = &self.workspace;
        let mut argv = vec![
            "citydb".to_string(),
            "import".to_string(),
            workspace.input().as_str().to_string(),
            format!("--{ARG_TEMP_DIR}"),
            workspace.cache_dir().as_str().to_string(),
            format!("--{ARG_THREADS}"),
            "2".to_string(),
        ];
        if *self.include_database.borrow() {
            argv.extend([
                format!("--{ARG_DATABASE}"),
                workspace.database().as_str().to_string(),
            ]);
        }
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }
}

#[fixture]
fn world() -> ImportWorld {
    ImportWorld::new()
}

#[given("a feature stream with two related buildings")]
fn related_stream(#[from(world)] world: &ImportWorld) {
    write_feature_lines(&world.workspace.input(), &related_buildings());
}

#[given("a feature stream with a dangling reference")]
fn dangling_stream(#[from(world)] world: &ImportWorld) {
    write_feature_lines(
        &world.workspace.input(),
        &[related_to(building("bldg-1"), "#demolished")],
    );
}

#[given("the feature stream contains invalid JSON")]
fn invalid_stream(#[from(world)] world: &ImportWorld) {
    write_utf8(&world.workspace.input(), b"{ not valid json");
}

#[given("a target database path")]
fn target_database(#[from(world)] world: &ImportWorld) {
    *world.include_database.borrow_mut() = true;
}

#[given("I omit the database path")]
fn omit_database(#[from(world)] world: &ImportWorld) {
    *world.include_database.borrow_mut() = false;
}

#[given("strict reference checking is enabled")]
fn strict_references(#[from(world)] world: &ImportWorld) {
    world
        .cli_args
        .borrow_mut()
        .push(format!("--{ARG_STRICT_REFERENCES}"));
}

#[when("I run the import command")]
fn run_import_command(#[from(world)] world: &ImportWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Import(args) => {
            let mut buffer = world.stdout.borrow_mut();
            run_import_with(args, &mut *buffer)
        }
    });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds and prints the import summary")]
fn command_prints_summary(#[from(world)] world: &ImportWorld) {
    let borrowed = world.result.borrow();
    let result = borrowed.as_ref().expect("result recorded");
    if let Err(err) = result {
        panic!("expected success, found {err:?}");
    }

    let stdout = String::from_utf8(world.stdout.borrow().clone()).expect("stdout utf-8");
    let summary: serde_json::Value =
        serde_json::from_str(&stdout).expect("output should be a JSON import summary");
    let expected = serde_json::to_value(ImportSummary {
        features: 2,
        resolved_references: 1,
        unresolved_references: 0,
    })
    .expect("encode expected summary");
    assert_eq!(summary, expected);
    assert!(world.workspace.database().exists(), "database should be created");
}

#[then("the command fails because the database path is missing")]
fn command_fails_missing_database(#[from(world)] world: &ImportWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, env } => {
            assert_eq!(*field, ARG_DATABASE);
            assert_eq!(*env, ENV_DATABASE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[then("the command fails because the feature JSON is invalid")]
fn command_fails_invalid_json(#[from(world)] world: &ImportWorld) {
    match &*world.error() {
        CliError::ParseFeature { index, .. } => assert_eq!(*index, 0),
        other => panic!("expected ParseFeature, found {other:?}"),
    }
}

#[then("the command fails because references are unresolved")]
fn command_fails_unresolved(#[from(world)] world: &ImportWorld) {
    match &*world.error() {
        CliError::Import {
            source: ImportError::References(ReferenceError::UnresolvedReferences { count }),
        } => assert_eq!(*count, 1),
        other => panic!("expected unresolved references, found {other:?}"),
    }
    assert!(world.stdout.borrow().is_empty(), "no summary on failure");
}

macro_rules! register_import_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/import_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: ImportWorld) {
            let _ = world;
        }
    };
}

register_import_scenario!(import_happy_path, "importing features from a JSON stream");
register_import_scenario!(import_missing_database, "rejecting a missing database path");
register_import_scenario!(import_invalid_json, "rejecting invalid feature JSON");
register_import_scenario!(
    import_strict_references,
    "failing on dangling references in strict mode"
);
