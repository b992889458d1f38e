//! Features and the properties attached to them.
//!
//! Format readers produce these values; the importer family walks them to
//! derive table rows. Values are plain data: no validation beyond what the
//! types enforce happens here.

use geo::{BoundingRect, Coord, Geometry, Rect};
use serde::{Deserialize, Serialize};

use crate::{Address, Appearance, ImplicitGeometry, Reference};

/// A city object.
///
/// # Examples
/// ```
/// use citydb_core::{AttributeValue, Feature, Property, PropertyValue};
///
/// let feature = Feature::new("bldg:Building")
///     .with_object_id("bldg-1")
///     .with_property(Property::new(
///         "storeysAboveGround",
///         PropertyValue::Attribute(AttributeValue::Integer(3)),
///     ));
/// assert_eq!(feature.object_id.as_deref(), Some("bldg-1"));
/// assert_eq!(feature.properties.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Qualified feature type name, for example `bldg:Building`.
    pub feature_type: String,
    /// Source identifier (`gml:id`) used to resolve references.
    #[serde(default)]
    pub object_id: Option<String>,
    /// External identifier.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Codespace qualifying [`Feature::identifier`].
    #[serde(default)]
    pub identifier_codespace: Option<String>,
    /// Creation timestamp in the source system.
    #[serde(default)]
    pub creation_date: Option<String>,
    /// Termination timestamp in the source system.
    #[serde(default)]
    pub termination_date: Option<String>,
    /// Free-text lineage information.
    #[serde(default)]
    pub lineage: Option<String>,
    /// Ordered feature properties.
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Feature {
    /// Create a feature of the given type without properties.
    pub fn new(feature_type: impl Into<String>) -> Self {
        Self {
            feature_type: feature_type.into(),
            object_id: None,
            identifier: None,
            identifier_codespace: None,
            creation_date: None,
            termination_date: None,
            lineage: None,
            properties: Vec::new(),
        }
    }

    /// Set the source identifier.
    #[must_use]
    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    /// Append a property.
    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Bounding rectangle of every geometry reachable through properties,
    /// excluding geometries of nested features.
    pub fn envelope(&self) -> Option<Rect<f64>> {
        let mut envelope = None;
        collect_bounds(&self.properties, &mut envelope);
        envelope
    }
}

fn collect_bounds(properties: &[Property], envelope: &mut Option<Rect<f64>>) {
    for property in properties {
        match &property.value {
            PropertyValue::Geometry(geometry) => {
                if let Some(bounds) = geometry.geometry.bounding_rect() {
                    include_bounds(envelope, bounds);
                }
            }
            PropertyValue::Complex(nested) => collect_bounds(nested, envelope),
            PropertyValue::Attribute(_)
            | PropertyValue::ImplicitGeometry(_)
            | PropertyValue::Feature(_)
            | PropertyValue::Address(_)
            | PropertyValue::Appearance(_) => {}
        }
    }
}

fn include_bounds(envelope: &mut Option<Rect<f64>>, bounds: Rect<f64>) {
    match envelope {
        Some(existing) => {
            let min = Coord {
                x: existing.min().x.min(bounds.min().x),
                y: existing.min().y.min(bounds.min().y),
            };
            let max = Coord {
                x: existing.max().x.max(bounds.max().x),
                y: existing.max().y.max(bounds.max().y),
            };
            *existing = Rect::new(min, max);
        }
        None => *envelope = Some(bounds),
    }
}

/// A named property of a feature or of a complex property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Namespace of the property name, if qualified.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Local property name.
    pub name: String,
    /// Property content.
    pub value: PropertyValue,
}

impl Property {
    /// Create an unqualified property.
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            value,
        }
    }

    /// Qualify the property name with a namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Content of a [`Property`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PropertyValue {
    /// A simple attribute value.
    Attribute(AttributeValue),
    /// A property made of nested properties.
    Complex(Vec<Property>),
    /// An explicit geometry.
    Geometry(GeometryProperty),
    /// An implicit geometry, inline or by reference.
    ImplicitGeometry(ImplicitGeometryProperty),
    /// A related or contained feature.
    Feature(FeatureProperty),
    /// A postal address, inline or by reference.
    Address(AddressProperty),
    /// An appearance of the owning feature.
    Appearance(Appearance),
}

impl PropertyValue {
    /// Data type label written to `property.datatype`.
    pub const fn data_type(&self) -> &'static str {
        match self {
            Self::Attribute(value) => value.data_type(),
            Self::Complex(_) => "Complex",
            Self::Geometry(_) => "GeometryProperty",
            Self::ImplicitGeometry(_) => "ImplicitGeometryProperty",
            Self::Feature(_) => "FeatureProperty",
            Self::Address(_) => "AddressProperty",
            Self::Appearance(_) => "AppearanceProperty",
        }
    }
}

/// Scalar attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum AttributeValue {
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Double(f64),
    /// Free text.
    String(String),
    /// Boolean flag.
    Boolean(bool),
    /// ISO 8601 timestamp, stored verbatim.
    Timestamp(String),
    /// URI.
    Uri(String),
    /// Code list value.
    Code {
        /// Code value.
        value: String,
        /// Code list the value is drawn from.
        #[serde(default)]
        code_space: Option<String>,
    },
    /// Numeric measurement.
    Measure {
        /// Measured value.
        value: f64,
        /// Unit of measurement.
        uom: String,
    },
}

impl AttributeValue {
    /// Data type label written to `property.datatype`.
    pub const fn data_type(&self) -> &'static str {
        match self {
            Self::Integer(_) => "Integer",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::Boolean(_) => "Boolean",
            Self::Timestamp(_) => "Timestamp",
            Self::Uri(_) => "URI",
            Self::Code { .. } => "Code",
            Self::Measure { .. } => "Measure",
        }
    }
}

/// Explicit geometry with an optional level of detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryProperty {
    /// Geometry in the target reference system.
    pub geometry: Geometry<f64>,
    /// Level of detail the geometry represents.
    #[serde(default)]
    pub lod: Option<u8>,
}

/// Implicit geometry property: a library object placed by a reference point
/// and a transformation matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicitGeometryProperty {
    /// The library object, inline or by reference.
    pub target: ImplicitGeometryTarget,
    /// Anchor point of the instance.
    #[serde(default)]
    pub reference_point: Option<Coord<f64>>,
    /// Row-major 4x4 transformation matrix.
    #[serde(default)]
    pub transformation: Option<[f64; 16]>,
    /// Level of detail the instance represents.
    #[serde(default)]
    pub lod: Option<u8>,
}

/// Library object of an [`ImplicitGeometryProperty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplicitGeometryTarget {
    /// The library object is defined inline.
    Inline(ImplicitGeometry),
    /// The library object is defined elsewhere.
    Reference(Reference),
}

/// Link from a feature to another feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureProperty {
    /// The referenced feature is a child of the owning feature.
    Inline(Box<Feature>),
    /// The referenced feature is defined elsewhere.
    Reference(Reference),
}

impl FeatureProperty {
    /// Relation type written to `property.val_relation_type`: `1` for
    /// contained features and `0` for related ones.
    pub const fn relation_type(&self) -> i64 {
        match self {
            Self::Inline(_) => 1,
            Self::Reference(_) => 0,
        }
    }
}

/// Link from a feature to an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressProperty {
    /// The address is defined inline.
    Inline(Address),
    /// The address is defined elsewhere.
    Reference(Reference),
}
