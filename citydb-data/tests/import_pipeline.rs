//! Integration tests for batching, commit ordering and run summaries.

mod support;

use citydb_core::test_support::{building, related_to, with_address, with_appearance};
use citydb_core::{Feature, FeatureProperty, ImportOptions, ObjectKind, Property, PropertyValue};
use citydb_data::{ImportError, Importer, ImporterKind, ReferenceError};
use rstest::{fixture, rstest};
use support::{Workspace, count_rows, feature_id};

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

fn start(workspace: &Workspace, options: &ImportOptions) -> Importer {
    Importer::new(workspace.dyn_adapter(), options)
        .unwrap_or_else(|err| panic!("start importer: {err}"))
}

fn bare(object_id: &str) -> Feature {
    Feature::new("bldg:Building").with_object_id(object_id)
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(5)]
fn feature_batches_flush_at_threshold(workspace: Workspace, #[case] batch_size: usize) {
    let importer = start(&workspace, &workspace.options().with_batch_size(batch_size));
    let mut session = importer
        .session()
        .unwrap_or_else(|err| panic!("open session: {err}"));
    let connection = workspace.connection();

    for index in 1..=batch_size {
        session
            .import_feature(&bare(&format!("bldg-{index}")))
            .unwrap_or_else(|err| panic!("import: {err}"));
        let expected_pending = index % batch_size;
        assert_eq!(session.pending_for(ImporterKind::Feature), expected_pending);
        let written = if expected_pending == 0 { index } else { 0 };
        let written = i64::try_from(written).expect("row count fits in i64");
        assert_eq!(count_rows(&connection, "feature"), written);
    }
    assert_eq!(session.pending(), 0);
    assert!(session.cache(ObjectKind::Feature).is_none_or(|cache| cache.is_empty()));

    session
        .close()
        .unwrap_or_else(|err| panic!("close session: {err}"));
    importer
        .finish()
        .unwrap_or_else(|err| panic!("finish: {err}"));
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(1000)]
fn parents_reach_the_database_before_children(workspace: Workspace, #[case] batch_size: usize) {
    let importer = start(&workspace, &workspace.options().with_batch_size(batch_size));
    let mut session = importer
        .session()
        .unwrap_or_else(|err| panic!("open session: {err}"));
    let feature = with_appearance(
        with_address(building("bldg-1"), "addr-1"),
        "mat-1",
        &["roof.png", "wall.png"],
    );
    session
        .import_feature(&feature)
        .unwrap_or_else(|err| panic!("import with foreign keys enforced: {err}"));
    session
        .close()
        .unwrap_or_else(|err| panic!("close session: {err}"));
    importer
        .finish()
        .unwrap_or_else(|err| panic!("finish: {err}"));

    let connection = workspace.connection();
    assert_eq!(count_rows(&connection, "feature"), 1);
    assert_eq!(count_rows(&connection, "geometry_data"), 1);
    assert_eq!(count_rows(&connection, "address"), 1);
    assert_eq!(count_rows(&connection, "tex_image"), 2);
    assert_eq!(count_rows(&connection, "surface_data"), 3);
    assert_eq!(count_rows(&connection, "appear_to_surface_data"), 3);
    assert_eq!(count_rows(&connection, "property"), 4);
}

#[rstest]
fn nested_features_are_contained(workspace: Workspace) {
    let importer = start(&workspace, &workspace.options());
    let mut session = importer
        .session()
        .unwrap_or_else(|err| panic!("open session: {err}"));
    let parent = bare("bldg-1").with_property(Property::new(
        "consistsOfBuildingPart",
        PropertyValue::Feature(FeatureProperty::Inline(Box::new(bare("part-1")))),
    ));
    session
        .import_feature(&parent)
        .unwrap_or_else(|err| panic!("import: {err}"));
    session
        .close()
        .unwrap_or_else(|err| panic!("close session: {err}"));
    let summary = importer
        .finish()
        .unwrap_or_else(|err| panic!("finish: {err}"));
    assert_eq!(summary.features, 2);

    let connection = workspace.connection();
    let part = feature_id(&connection, "part-1");
    let (linked, relation): (i64, i64) = connection
        .query_row(
            "SELECT val_feature_id, val_relation_type FROM property
             WHERE name = 'consistsOfBuildingPart'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap_or_else(|err| panic!("read relation: {err}"));
    assert_eq!(linked, part);
    assert_eq!(relation, 1);
}

#[rstest]
fn unknown_targets_are_counted_as_unresolved(workspace: Workspace) {
    let importer = start(&workspace, &workspace.options());
    let mut session = importer
        .session()
        .unwrap_or_else(|err| panic!("open session: {err}"));
    session
        .import_feature(&related_to(bare("bldg-1"), "#missing"))
        .unwrap_or_else(|err| panic!("import: {err}"));
    session
        .close()
        .unwrap_or_else(|err| panic!("close session: {err}"));
    let summary = importer
        .finish()
        .unwrap_or_else(|err| panic!("finish: {err}"));
    assert_eq!(summary.features, 1);
    assert_eq!(summary.resolved_references, 0);
    assert_eq!(summary.unresolved_references, 1);

    let connection = workspace.connection();
    let target: Option<i64> = connection
        .query_row(
            "SELECT val_feature_id FROM property WHERE name = 'relatedTo'",
            [],
            |row| row.get(0),
        )
        .unwrap_or_else(|err| panic!("read reference: {err}"));
    assert_eq!(target, None);
}

#[rstest]
fn strict_runs_fail_on_unresolved_references(workspace: Workspace) {
    let importer = start(&workspace, &workspace.options().with_strict_references(true));
    let mut session = importer
        .session()
        .unwrap_or_else(|err| panic!("open session: {err}"));
    session
        .import_feature(&related_to(bare("bldg-1"), "#missing"))
        .unwrap_or_else(|err| panic!("import: {err}"));
    session
        .close()
        .unwrap_or_else(|err| panic!("close session: {err}"));
    let err = importer.finish().expect_err("strict run must fail");
    assert!(matches!(
        err,
        ImportError::References(ReferenceError::UnresolvedReferences { count: 1 })
    ));
}

#[rstest]
fn invalid_options_are_rejected(workspace: Workspace) {
    let err = Importer::new(workspace.dyn_adapter(), &workspace.options().with_batch_size(0))
        .expect_err("zero batch size must be rejected");
    assert!(matches!(err, ImportError::Options { .. }));
}

#[rstest]
fn identifiers_continue_after_existing_rows(workspace: Workspace) {
    support::seed_feature(&workspace.connection(), 41, "existing");
    let importer = start(&workspace, &workspace.options());
    let mut session = importer
        .session()
        .unwrap_or_else(|err| panic!("open session: {err}"));
    let id = session
        .import_feature(&bare("bldg-1"))
        .unwrap_or_else(|err| panic!("import: {err}"));
    assert_eq!(id, 42);
    session
        .close()
        .unwrap_or_else(|err| panic!("close session: {err}"));
    importer
        .finish()
        .unwrap_or_else(|err| panic!("finish: {err}"));
}

#[rstest]
fn map_store_is_removed_after_finish(workspace: Workspace) {
    let importer = start(&workspace, &workspace.options());
    assert_eq!(workspace.cache_files(), 1);
    importer
        .finish()
        .unwrap_or_else(|err| panic!("finish: {err}"));
    assert_eq!(workspace.cache_files(), 0);
}
