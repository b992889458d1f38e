//! Catalogue of the 3D City Database tables written by the importer family.
//!
//! Each table declares the tables its foreign keys point at. Commit ordering
//! is derived from these edges so that parent rows always reach the database
//! before the rows that reference them.
//!
//! # Examples
//! ```
//! use citydb_core::Table;
//!
//! assert_eq!(Table::Property.as_str(), "property");
//! assert!(Table::Property.dependencies().contains(&Table::Feature));
//! ```

/// A table populated during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    /// City objects and their metadata.
    Feature,
    /// Geometry payloads owned by features or implicit geometries.
    GeometryData,
    /// Prototypical geometries shared through implicit representations.
    ImplicitGeometry,
    /// Postal addresses.
    Address,
    /// Texture images, deduplicated by URI.
    TexImage,
    /// Appearance containers attached to features.
    Appearance,
    /// Materials and textures.
    SurfaceData,
    /// Join table linking appearances to surface data.
    AppearToSurfaceData,
    /// Attribute, geometry and relation properties of features.
    Property,
}

impl Table {
    /// Every table, listed in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Feature,
        Self::GeometryData,
        Self::ImplicitGeometry,
        Self::Address,
        Self::TexImage,
        Self::Appearance,
        Self::SurfaceData,
        Self::AppearToSurfaceData,
        Self::Property,
    ];

    /// Number of tables in the catalogue.
    pub const COUNT: usize = Self::ALL.len();

    /// Return the unqualified SQL table name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::GeometryData => "geometry_data",
            Self::ImplicitGeometry => "implicit_geometry",
            Self::Address => "address",
            Self::TexImage => "tex_image",
            Self::Appearance => "appearance",
            Self::SurfaceData => "surface_data",
            Self::AppearToSurfaceData => "appear_to_surface_data",
            Self::Property => "property",
        }
    }

    /// Tables referenced by this table's foreign keys.
    ///
    /// Self references (such as `property.parent_id`) are omitted; rows of a
    /// single table are written in insertion order.
    pub const fn dependencies(self) -> &'static [Self] {
        match self {
            Self::Feature | Self::Address | Self::TexImage => &[],
            Self::GeometryData => &[Self::Feature],
            Self::ImplicitGeometry => &[Self::GeometryData],
            Self::Appearance => &[Self::Feature, Self::ImplicitGeometry],
            Self::SurfaceData => &[Self::TexImage],
            Self::AppearToSurfaceData => &[Self::Appearance, Self::SurfaceData],
            Self::Property => &[
                Self::Feature,
                Self::GeometryData,
                Self::ImplicitGeometry,
                Self::Address,
                Self::Appearance,
            ],
        }
    }

    /// Position of the table inside [`Table::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::Feature => 0,
            Self::GeometryData => 1,
            Self::ImplicitGeometry => 2,
            Self::Address => 3,
            Self::TexImage => 4,
            Self::Appearance => 5,
            Self::SurfaceData => 6,
            Self::AppearToSurfaceData => 7,
            Self::Property => 8,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn index_matches_position_in_all() {
        for (position, table) in Table::ALL.iter().enumerate() {
            assert_eq!(table.index(), position, "index mismatch for {table}");
        }
    }

    #[rstest]
    fn dependencies_never_reference_self() {
        for table in Table::ALL {
            assert!(
                !table.dependencies().contains(&table),
                "{table} must not list itself as a dependency"
            );
        }
    }
}
