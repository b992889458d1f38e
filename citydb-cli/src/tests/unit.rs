//! Focused unit tests covering import CLI configuration validation.

use super::helpers::{Workspace, write_utf8};
use super::*;
use crate::import::{ImportConfig, config_from_layers_for_test};
use camino::Utf8PathBuf;
use citydb_core::ImportOptions;
use ortho_config::MergeComposer;
use rstest::rstest;
use serde_json::json;

fn args(input: Option<&str>, database: Option<&str>) -> ImportArgs {
    ImportArgs {
        input: input.map(Utf8PathBuf::from),
        database: database.map(Utf8PathBuf::from),
        ..ImportArgs::default()
    }
}

#[rstest]
#[case(None, Some("city.db"), ARG_INPUT, ENV_INPUT)]
#[case(Some("features.jsonl"), None, ARG_DATABASE, ENV_DATABASE)]
fn converting_without_required_fields_errors(
    #[case] input: Option<&str>,
    #[case] database: Option<&str>,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let err = ImportConfig::try_from(args(input, database)).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn converting_maps_every_option() {
    let merged = ImportArgs {
        batch_size: Some(250),
        threads: Some(3),
        temp_dir: Some(Utf8PathBuf::from("scratch")),
        cache_size_kib: Some(4096),
        strict_references: Some(true),
        ..args(Some("features.jsonl"), Some("city.db"))
    };
    let config = ImportConfig::try_from(merged).expect("config should build");
    assert_eq!(config.input, Utf8PathBuf::from("features.jsonl"));
    assert_eq!(config.database, Utf8PathBuf::from("city.db"));
    assert_eq!(
        config.options,
        ImportOptions::default()
            .with_batch_size(250)
            .with_threads(3)
            .with_temp_dir("scratch")
            .with_cache_size_kib(4096)
            .with_strict_references(true)
    );
}

#[rstest]
fn converting_keeps_defaults_for_unset_options() {
    let config = ImportConfig::try_from(args(Some("features.jsonl"), Some("city.db")))
        .expect("config should build");
    assert_eq!(config.options, ImportOptions::default());
}

#[rstest]
fn validate_sources_reports_missing_input() {
    let workspace = Workspace::new();
    let config = ImportConfig {
        input: workspace.input(),
        database: workspace.database(),
        options: ImportOptions::default(),
    };
    let err = config.validate_sources().expect_err("expected failure");
    match err {
        CliError::MissingSourceFile { field, path } => {
            assert_eq!(field, ARG_INPUT);
            assert_eq!(path, workspace.input());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
fn validate_sources_rejects_directories() {
    let workspace = Workspace::new();
    let config = ImportConfig {
        input: workspace.root().to_path_buf(),
        database: workspace.database(),
        options: ImportOptions::default(),
    };
    let err = config
        .validate_sources()
        .expect_err("expected directory rejection");
    match err {
        CliError::SourcePathNotFile { field, .. } => assert_eq!(field, ARG_INPUT),
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
#[case::zero_batch(ImportOptions::default().with_batch_size(0))]
#[case::zero_threads(ImportOptions::default().with_threads(0))]
fn validate_sources_rejects_invalid_options(#[case] options: ImportOptions) {
    let workspace = Workspace::new();
    write_utf8(&workspace.input(), b"");
    let config = ImportConfig {
        input: workspace.input(),
        database: workspace.database(),
        options,
    };
    let err = config.validate_sources().expect_err("expected options rejection");
    match err {
        CliError::InvalidOptions { .. } => {}
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
#[case(&["citydb", "import", "in.jsonl"], None)]
#[case(&["citydb", "import", "in.jsonl", "--strict-references"], Some(true))]
#[case(&["citydb", "import", "in.jsonl", "--strict-references=false"], Some(false))]
fn strict_references_flag_is_optional(
    #[case] argv: &[&str],
    #[case] expected: Option<bool>,
) {
    let cli = Cli::try_parse_from(argv).expect("arguments should parse");
    let Command::Import(args) = cli.command;
    assert_eq!(args.strict_references, expected);
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "batch_size": "many" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "database": "from-file.db",
            "batch_size": 100,
            "threads": 8,
        }),
        None,
    );
    composer.push_environment(json!({
        "input": "from-env.jsonl",
        "batch_size": 200,
    }));
    composer.push_cli(json!({
        "batch_size": 300,
    }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.input, Utf8PathBuf::from("from-env.jsonl"));
    assert_eq!(config.database, Utf8PathBuf::from("from-file.db"));
    assert_eq!(config.options.batch_size, 300);
    assert_eq!(config.options.threads, Some(8));
}
