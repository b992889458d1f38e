//! Test-only builders for features with cross references, shared by unit and
//! behaviour tests across the workspace.

use geo::{Geometry, Point, polygon};

use crate::{
    Address, AddressProperty, Appearance, AttributeValue, Feature, FeatureProperty,
    GeometryProperty, ImplicitGeometry, ImplicitGeometryProperty, ImplicitGeometryTarget, Material,
    Property, PropertyValue, Reference, SurfaceData, SurfaceDataContent, SurfaceDataProperty,
    Texture,
};

/// Building with a footprint, a storey count and an inline address.
pub fn building(object_id: &str) -> Feature {
    let footprint = polygon![
        (x: 0.0, y: 0.0),
        (x: 10.0, y: 0.0),
        (x: 10.0, y: 10.0),
        (x: 0.0, y: 10.0),
        (x: 0.0, y: 0.0),
    ];
    Feature::new("bldg:Building")
        .with_object_id(object_id)
        .with_property(Property::new(
            "storeysAboveGround",
            PropertyValue::Attribute(AttributeValue::Integer(3)),
        ))
        .with_property(Property::new(
            "lod0FootPrint",
            PropertyValue::Geometry(GeometryProperty {
                geometry: Geometry::Polygon(footprint),
                lod: Some(0),
            }),
        ))
}

/// Attach a `relatedTo` feature reference to `feature`.
pub fn related_to(feature: Feature, href: &str) -> Feature {
    feature.with_property(Property::new(
        "relatedTo",
        PropertyValue::Feature(FeatureProperty::Reference(Reference::new(href))),
    ))
}

/// Attach an inline address carrying `object_id`.
pub fn with_address(feature: Feature, object_id: &str) -> Feature {
    feature.with_property(Property::new(
        "address",
        PropertyValue::Address(AddressProperty::Inline(
            Address::new()
                .with_object_id(object_id)
                .with_street("Main Street", Some("1")),
        )),
    ))
}

/// Attach an address reference.
pub fn with_address_reference(feature: Feature, href: &str) -> Feature {
    feature.with_property(Property::new(
        "address",
        PropertyValue::Address(AddressProperty::Reference(Reference::new(href))),
    ))
}

/// Solitary vegetation object placing an implicit geometry.
pub fn tree(object_id: &str, target: ImplicitGeometryTarget) -> Feature {
    Feature::new("veg:SolitaryVegetationObject")
        .with_object_id(object_id)
        .with_property(Property::new(
            "lod1ImplicitRepresentation",
            PropertyValue::ImplicitGeometry(ImplicitGeometryProperty {
                target,
                reference_point: Some(Point::new(5.0, 5.0).into()),
                transformation: Some(identity_matrix()),
                lod: Some(1),
            }),
        ))
}

/// Inline implicit geometry prototype.
pub fn prototype(object_id: &str) -> ImplicitGeometryTarget {
    ImplicitGeometryTarget::Inline(
        ImplicitGeometry::relative(Geometry::Point(Point::new(0.0, 0.0)))
            .with_object_id(object_id),
    )
}

/// Attach an appearance with one material and one texture per image URI.
pub fn with_appearance(feature: Feature, material_id: &str, image_uris: &[&str]) -> Feature {
    let mut surface_data = vec![SurfaceDataProperty::Inline(
        SurfaceData::new(SurfaceDataContent::Material(Material {
            diffuse_color: Some([0.8, 0.2, 0.2]),
            transparency: Some(0.0),
        }))
        .with_object_id(material_id),
    )];
    surface_data.extend(image_uris.iter().map(|uri| {
        SurfaceDataProperty::Inline(SurfaceData::new(SurfaceDataContent::Texture(
            Texture::new(*uri),
        )))
    }));
    feature.with_property(Property::new(
        "appearance",
        PropertyValue::Appearance(Appearance {
            theme: Some("rgbTexture".into()),
            surface_data,
            ..Appearance::default()
        }),
    ))
}

/// Attach an appearance referencing surface data defined elsewhere.
pub fn with_shared_surface_data(feature: Feature, href: &str) -> Feature {
    feature.with_property(Property::new(
        "appearance",
        PropertyValue::Appearance(Appearance {
            theme: Some("rgbTexture".into()),
            surface_data: vec![SurfaceDataProperty::Reference(Reference::new(href))],
            ..Appearance::default()
        }),
    ))
}

fn identity_matrix() -> [f64; 16] {
    let mut matrix = [0.0; 16];
    for diagonal in [0, 5, 10, 15] {
        matrix[diagonal] = 1.0;
    }
    matrix
}
