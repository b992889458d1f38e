//! Facade crate for the citydb import engine.
//!
//! This crate re-exports the domain model from `citydb-core` and the
//! database adapter, importer family and reference resolution from
//! `citydb-data`.

#![forbid(unsafe_code)]

pub use citydb_core::{
    Address, AddressProperty, Appearance, AttributeValue, Feature, FeatureProperty,
    GeometryProperty, ImplicitGeometry, ImplicitGeometryProperty, ImplicitGeometryTarget,
    ImportOptions, ImportOptionsError, Material, ObjectKind, Property, PropertyValue, Reference,
    ReferenceBinding, ReferenceBindings, SurfaceData, SurfaceDataContent, SurfaceDataProperty,
    Table, Texture,
};

pub use citydb_data::{
    AdapterError, DatabaseAdapter, ImportError, ImportHelper, ImportSummary, Importer,
    ReferenceError, ReferenceManager, ResolveSummary, SchemaError, SqliteAdapter,
    initialise_schema,
};

#[cfg(feature = "test-support")]
pub use citydb_core::test_support;
