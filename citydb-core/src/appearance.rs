//! Appearances: themed collections of materials and textures.

use serde::{Deserialize, Serialize};

use crate::Reference;

/// Appearance of a feature under a theme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    /// Source identifier.
    #[serde(default)]
    pub object_id: Option<String>,
    /// External identifier.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Theme name, for example `rgbTexture`.
    #[serde(default)]
    pub theme: Option<String>,
    /// Surface data members, inline or by reference.
    #[serde(default)]
    pub surface_data: Vec<SurfaceDataProperty>,
}

/// Member of an [`Appearance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceDataProperty {
    /// Surface data defined inline.
    Inline(SurfaceData),
    /// Surface data defined by another appearance.
    Reference(Reference),
}

/// A material or a texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceData {
    /// Source identifier used to resolve references.
    #[serde(default)]
    pub object_id: Option<String>,
    /// External identifier.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Whether the data applies to the front face.
    #[serde(default = "front_face")]
    pub is_front: bool,
    /// Material or texture parameters.
    pub content: SurfaceDataContent,
}

const fn front_face() -> bool {
    true
}

impl SurfaceData {
    /// Create front-facing surface data.
    pub fn new(content: SurfaceDataContent) -> Self {
        Self {
            object_id: None,
            identifier: None,
            is_front: true,
            content,
        }
    }

    /// Set the source identifier.
    #[must_use]
    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }
}

/// Parameters of a [`SurfaceData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceDataContent {
    /// X3D material.
    Material(Material),
    /// Parameterized texture.
    Texture(Texture),
}

impl SurfaceDataContent {
    /// Type label written to `surface_data.surface_data_type`.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Material(_) => "X3DMaterial",
            Self::Texture(_) => "ParameterizedTexture",
        }
    }
}

/// X3D material parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Diffuse RGB colour with components in `[0, 1]`.
    #[serde(default)]
    pub diffuse_color: Option<[f64; 3]>,
    /// Transparency in `[0, 1]`.
    #[serde(default)]
    pub transparency: Option<f64>,
}

/// Texture parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    /// URI of the texture image; images are shared by URI.
    pub image_uri: String,
    /// MIME type of the image.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Texture type, for example `specific` or `typical`.
    #[serde(default)]
    pub texture_type: Option<String>,
    /// Wrap mode, for example `wrap` or `clamp`.
    #[serde(default)]
    pub wrap_mode: Option<String>,
}

impl Texture {
    /// Create a texture pointing at `image_uri`.
    pub fn new(image_uri: impl Into<String>) -> Self {
        Self {
            image_uri: image_uri.into(),
            mime_type: None,
            texture_type: None,
            wrap_mode: None,
        }
    }
}
