use geo::Geometry;
use serde::{Deserialize, Serialize};

/// A prototypical geometry shared by implicit representations.
///
/// The prototype is either an explicit relative geometry or an external
/// library object (for example a mesh file) identified by URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicitGeometry {
    /// Source identifier used to resolve references.
    #[serde(default)]
    pub object_id: Option<String>,
    /// MIME type of the library object.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// URI of the external library object.
    #[serde(default)]
    pub library_object: Option<String>,
    /// Geometry expressed relative to the reference point.
    #[serde(default)]
    pub relative_geometry: Option<Geometry<f64>>,
}

impl ImplicitGeometry {
    /// Create a prototype backed by a relative geometry.
    pub fn relative(geometry: Geometry<f64>) -> Self {
        Self {
            object_id: None,
            mime_type: None,
            library_object: None,
            relative_geometry: Some(geometry),
        }
    }

    /// Set the source identifier.
    #[must_use]
    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }
}
