//! Object kinds, their foreign-key bindings, and by-reference links.
//!
//! A reference names another object by its source identifier. Until that
//! object receives a database identifier the referencing row is written with a
//! NULL foreign key; the binding table records which table and column must be
//! updated once the target is known.

use serde::{Deserialize, Serialize};

use crate::Table;

/// Category of objects that can be referenced by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    /// City object features.
    Feature,
    /// Implicit geometry library objects.
    ImplicitGeometry,
    /// Postal addresses.
    Address,
    /// Materials and textures shared between appearances.
    SurfaceData,
    /// Texture images keyed by their URI.
    TextureImage,
}

impl ObjectKind {
    /// Every object kind, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Feature,
        Self::ImplicitGeometry,
        Self::Address,
        Self::SurfaceData,
        Self::TextureImage,
    ];

    /// Short identifier used to derive persistent map names.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::ImplicitGeometry => "implicit_geometry",
            Self::Address => "address",
            Self::SurfaceData => "surface_data",
            Self::TextureImage => "tex_image",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Binds an object kind to the column that stores resolved references.
///
/// # Examples
/// ```
/// use citydb_core::{ObjectKind, ReferenceBindings, Table};
///
/// let bindings = ReferenceBindings::standard();
/// let binding = bindings.get(ObjectKind::Feature).expect("feature binding");
/// assert_eq!(binding.table(), Table::Property);
/// assert_eq!(binding.column(), "val_feature_id");
/// assert_eq!(binding.target_map_name(), "feature_t");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBinding {
    kind: ObjectKind,
    table: Table,
    column: &'static str,
    label: &'static str,
}

impl ReferenceBinding {
    /// Create a binding for `kind` updating `table.column`.
    pub const fn new(
        kind: ObjectKind,
        table: Table,
        column: &'static str,
        label: &'static str,
    ) -> Self {
        Self {
            kind,
            table,
            column,
            label,
        }
    }

    /// Object kind served by this binding.
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Table holding the referencing rows.
    pub const fn table(&self) -> Table {
        self.table
    }

    /// Foreign-key column updated during resolution.
    pub const fn column(&self) -> &'static str {
        self.column
    }

    /// Human readable label used in log output.
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Name of the persistent map holding `object id -> database id` targets.
    pub fn target_map_name(&self) -> String {
        format!("{}_t", self.kind.key())
    }

    /// Name of the persistent map holding `row id -> object id` references.
    pub fn reference_map_name(&self) -> String {
        format!("{}_r", self.kind.key())
    }
}

/// Immutable table of reference bindings, built once per import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBindings {
    bindings: Vec<ReferenceBinding>,
}

impl ReferenceBindings {
    /// Bindings matching the 3D City Database schema.
    pub fn standard() -> Self {
        Self::from_bindings([
            ReferenceBinding::new(
                ObjectKind::Feature,
                Table::Property,
                "val_feature_id",
                "feature",
            ),
            ReferenceBinding::new(
                ObjectKind::ImplicitGeometry,
                Table::Property,
                "val_implicitgeom_id",
                "implicit geometry",
            ),
            ReferenceBinding::new(
                ObjectKind::Address,
                Table::Property,
                "val_address_id",
                "address",
            ),
            ReferenceBinding::new(
                ObjectKind::SurfaceData,
                Table::AppearToSurfaceData,
                "surface_data_id",
                "surface data",
            ),
            ReferenceBinding::new(
                ObjectKind::TextureImage,
                Table::SurfaceData,
                "tex_image_id",
                "texture image",
            ),
        ])
    }

    /// Build a table from explicit bindings. A later binding for the same
    /// kind replaces an earlier one.
    pub fn from_bindings<I>(bindings: I) -> Self
    where
        I: IntoIterator<Item = ReferenceBinding>,
    {
        let mut table: Vec<ReferenceBinding> = Vec::new();
        for binding in bindings {
            table.retain(|existing| existing.kind != binding.kind);
            table.push(binding);
        }
        table.sort_by_key(ReferenceBinding::kind);
        Self { bindings: table }
    }

    /// Look up the binding for `kind`.
    pub fn get(&self, kind: ObjectKind) -> Option<&ReferenceBinding> {
        self.bindings.iter().find(|binding| binding.kind == kind)
    }

    /// Iterate over all bindings ordered by object kind.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceBinding> {
        self.bindings.iter()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the table holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for ReferenceBindings {
    fn default() -> Self {
        Self::standard()
    }
}

/// A by-reference link to another object, as found in `xlink:href`.
///
/// # Examples
/// ```
/// use citydb_core::Reference;
///
/// assert_eq!(Reference::new("#bldg-1").target_id(), Some("bldg-1"));
/// assert_eq!(Reference::new("#").target_id(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference {
    href: String,
}

impl Reference {
    /// Wrap an href.
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }

    /// The raw href as supplied by the source document.
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Identifier of the referenced object with any fragment marker removed.
    ///
    /// Returns `None` when nothing remains, in which case the reference is
    /// treated as absent.
    pub fn target_id(&self) -> Option<&str> {
        let trimmed = self.href.trim();
        let target = trimmed.strip_prefix('#').unwrap_or(trimmed);
        (!target.is_empty()).then_some(target)
    }
}
