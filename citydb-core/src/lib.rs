//! Core domain types for the citydb import engine.
//!
//! Features and their properties are plain data produced by format readers.
//! The table catalogue and the reference bindings describe where rows land
//! and which foreign keys are filled in once deferred references resolve.

mod address;
mod appearance;
mod feature;
mod implicit;
mod options;
mod reference;
mod table;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use address::Address;
pub use appearance::{
    Appearance, Material, SurfaceData, SurfaceDataContent, SurfaceDataProperty, Texture,
};
pub use feature::{
    AddressProperty, AttributeValue, Feature, FeatureProperty, GeometryProperty,
    ImplicitGeometryProperty, ImplicitGeometryTarget, Property, PropertyValue,
};
pub use implicit::ImplicitGeometry;
pub use options::{
    DEFAULT_BATCH_SIZE, DEFAULT_TEMP_DIR_NAME, ImportOptions, ImportOptionsError,
    MAX_RESOLUTION_BATCH_SIZE,
};
pub use reference::{ObjectKind, Reference, ReferenceBinding, ReferenceBindings};
pub use table::Table;
