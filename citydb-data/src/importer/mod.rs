//! Batched import of features into the 3D City Database tables.
//!
//! - [`ImporterKind`] enumerates the row shapes written per table.
//! - [`DatabaseImporter`] buffers rows of one kind and executes them.
//! - [`TableHelper`] owns the importers and knows the commit order.
//! - [`ImportHelper`] is one import session on one writer connection.
//! - [`Importer`] ties sessions, id sequences and reference resolution
//!   together for a whole run.

mod address;
mod appearance;
mod batch;
mod feature;
mod geometry;
mod helper;
mod implicit_geometry;
mod job;
mod property;
mod sequence;
mod tables;

use citydb_core::{ImportOptionsError, Table};
use rusqlite::Error as SqliteError;
use thiserror::Error;

use crate::adapter::AdapterError;
use crate::reference::ReferenceError;

pub use batch::DatabaseImporter;
pub use helper::ImportHelper;
pub use job::{ImportSummary, Importer};
pub use sequence::IdSequences;
pub use tables::TableHelper;

/// Row shapes written by the importer family.
///
/// Variants are ordered so that importers sharing a table execute in
/// declaration order during a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImporterKind {
    /// `feature` rows.
    Feature,
    /// `geometry_data` rows.
    Geometry,
    /// `implicit_geometry` rows.
    ImplicitGeometry,
    /// `address` rows.
    Address,
    /// `tex_image` rows.
    TextureImage,
    /// `appearance` rows.
    Appearance,
    /// `surface_data` rows.
    SurfaceData,
    /// `appear_to_surface_data` join rows.
    AppearToSurfaceData,
    /// `property` rows with every value column.
    Property,
    /// `property` rows whose target is resolved later.
    ReferenceProperty,
}

impl ImporterKind {
    /// Every importer kind.
    pub const ALL: [Self; 10] = [
        Self::Feature,
        Self::Geometry,
        Self::ImplicitGeometry,
        Self::Address,
        Self::TextureImage,
        Self::Appearance,
        Self::SurfaceData,
        Self::AppearToSurfaceData,
        Self::Property,
        Self::ReferenceProperty,
    ];

    /// Table receiving the rows.
    pub const fn table(self) -> Table {
        match self {
            Self::Feature => Table::Feature,
            Self::Geometry => Table::GeometryData,
            Self::ImplicitGeometry => Table::ImplicitGeometry,
            Self::Address => Table::Address,
            Self::TextureImage => Table::TexImage,
            Self::Appearance => Table::Appearance,
            Self::SurfaceData => Table::SurfaceData,
            Self::AppearToSurfaceData => Table::AppearToSurfaceData,
            Self::Property | Self::ReferenceProperty => Table::Property,
        }
    }

    /// Inserted columns, in parameter order.
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Feature => &[
                "id",
                "objectid",
                "identifier",
                "identifier_codespace",
                "feature_type",
                "envelope",
                "creation_date",
                "termination_date",
                "lineage",
            ],
            Self::Geometry => &["id", "geometry", "implicit_geometry", "feature_id"],
            Self::ImplicitGeometry => &[
                "id",
                "objectid",
                "mime_type",
                "reference_to_library",
                "relative_geometry_id",
            ],
            Self::Address => &[
                "id",
                "objectid",
                "identifier",
                "street",
                "house_number",
                "po_box",
                "zip_code",
                "city",
                "state",
                "country",
                "free_text",
                "multi_point",
            ],
            Self::TextureImage => &["id", "image_uri", "mime_type"],
            Self::Appearance => &[
                "id",
                "objectid",
                "identifier",
                "theme",
                "is_global",
                "feature_id",
                "implicit_geometry_id",
            ],
            Self::SurfaceData => &[
                "id",
                "objectid",
                "identifier",
                "is_front",
                "surface_data_type",
                "x3d_diffuse_color",
                "x3d_transparency",
                "tex_texture_type",
                "tex_wrap_mode",
            ],
            Self::AppearToSurfaceData => &["id", "surface_data_id", "appearance_id"],
            Self::Property => &[
                "id",
                "feature_id",
                "parent_id",
                "namespace",
                "name",
                "datatype",
                "val_int",
                "val_double",
                "val_string",
                "val_timestamp",
                "val_uri",
                "val_codespace",
                "val_uom",
                "val_array",
                "val_lod",
                "val_geometry_id",
                "val_implicitgeom_id",
                "val_implicitgeom_refpoint",
                "val_appearance_id",
                "val_address_id",
                "val_feature_id",
                "val_relation_type",
                "val_content",
            ],
            Self::ReferenceProperty => &[
                "id",
                "feature_id",
                "parent_id",
                "namespace",
                "name",
                "datatype",
                "val_uri",
                "val_array",
                "val_lod",
                "val_implicitgeom_refpoint",
                "val_relation_type",
            ],
        }
    }

    /// `INSERT` statement for `schema`.
    pub fn insert_sql(self, schema: &str) -> String {
        let columns = self.columns();
        let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("?{n}")).collect();
        format!(
            "INSERT INTO {schema}.{table} ({columns}) VALUES ({placeholders})",
            table = self.table(),
            columns = columns.join(", "),
            placeholders = placeholders.join(", "),
        )
    }
}

impl std::fmt::Display for ImporterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReferenceProperty => f.write_str("property (by reference)"),
            other => f.write_str(other.table().as_str()),
        }
    }
}

/// Errors raised while importing features.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The import options were rejected.
    #[error("invalid import options")]
    Options {
        /// Validation failure.
        #[source]
        source: ImportOptionsError,
    },
    /// Opening a writer connection failed.
    #[error("failed to connect to the database")]
    Connect {
        /// Underlying adapter error.
        #[source]
        source: AdapterError,
    },
    /// Preparing an importer's `INSERT` statement failed.
    #[error("failed to prepare insert statement for {kind}")]
    PrepareInsert {
        /// Importer whose statement failed.
        kind: ImporterKind,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A row did not match the importer's column list.
    #[error("{kind} row has {found} value(s) but {expected} column(s)")]
    RowShape {
        /// Importer receiving the row.
        kind: ImporterKind,
        /// Column count.
        expected: usize,
        /// Value count.
        found: usize,
    },
    /// Executing a batch failed.
    #[error("failed to execute {kind} batch")]
    Execute {
        /// Importer whose batch failed.
        kind: ImporterKind,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Beginning or committing the flush transaction failed.
    #[error("failed to {operation} import transaction")]
    Transaction {
        /// Operation being executed.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Reading the current maximum identifier of a table failed.
    #[error("failed to seed id sequence for {table}")]
    Sequence {
        /// Table being inspected.
        table: Table,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Encoding a JSON column failed.
    #[error("failed to encode {table}.{column}")]
    Encode {
        /// Table receiving the value.
        table: Table,
        /// Column receiving the value.
        column: &'static str,
        /// Source error returned by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// Reference caching or resolution failed.
    #[error(transparent)]
    References(#[from] ReferenceError),
}
