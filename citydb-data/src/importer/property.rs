//! Property rows, including properties whose target is resolved later.

use citydb_core::{
    AddressProperty, AttributeValue, FeatureProperty, ImplicitGeometryProperty,
    ImplicitGeometryTarget, ObjectKind, Property, PropertyValue, Reference, Table,
};
use rusqlite::types::Value;

use super::helper::{integer, json_column, text};
use super::{ImportError, ImportHelper, ImporterKind};

/// Column values of one `property` row.
#[derive(Debug, Default)]
struct PropertyRow {
    id: i64,
    feature_id: i64,
    parent_id: Option<i64>,
    namespace: Option<String>,
    name: String,
    datatype: &'static str,
    val_int: Option<i64>,
    val_double: Option<f64>,
    val_string: Option<String>,
    val_timestamp: Option<String>,
    val_uri: Option<String>,
    val_codespace: Option<String>,
    val_uom: Option<String>,
    val_array: Option<Value>,
    val_lod: Option<String>,
    val_geometry_id: Option<i64>,
    val_implicitgeom_id: Option<i64>,
    val_implicitgeom_refpoint: Option<Value>,
    val_appearance_id: Option<i64>,
    val_address_id: Option<i64>,
    val_feature_id: Option<i64>,
    val_relation_type: Option<i64>,
}

impl PropertyRow {
    fn new(id: i64, feature_id: i64, parent_id: Option<i64>, property: &Property) -> Self {
        Self {
            id,
            feature_id,
            parent_id,
            namespace: property.namespace.clone(),
            name: property.name.clone(),
            datatype: property.value.data_type(),
            ..Self::default()
        }
    }

    fn attribute(&mut self, value: &AttributeValue) {
        match value {
            AttributeValue::Integer(number) => self.val_int = Some(*number),
            AttributeValue::Double(number) => self.val_double = Some(*number),
            AttributeValue::String(string) => self.val_string = Some(string.clone()),
            AttributeValue::Boolean(flag) => self.val_int = Some(i64::from(*flag)),
            AttributeValue::Timestamp(timestamp) => {
                self.val_timestamp = Some(timestamp.clone());
            }
            AttributeValue::Uri(uri) => self.val_uri = Some(uri.clone()),
            AttributeValue::Code { value, code_space } => {
                self.val_string = Some(value.clone());
                self.val_codespace.clone_from(code_space);
            }
            AttributeValue::Measure { value, uom } => {
                self.val_double = Some(*value);
                self.val_uom = Some(uom.clone());
            }
        }
    }

    fn lod(&mut self, lod: Option<u8>) {
        self.val_lod = lod.map(|level| level.to_string());
    }

    fn placement(&mut self, implicit: &ImplicitGeometryProperty) -> Result<(), ImportError> {
        self.lod(implicit.lod);
        if let Some(matrix) = &implicit.transformation {
            self.val_array = Some(json_column(Table::Property, "val_array", matrix)?);
        }
        if let Some(point) = &implicit.reference_point {
            self.val_implicitgeom_refpoint = Some(json_column(
                Table::Property,
                "val_implicitgeom_refpoint",
                point,
            )?);
        }
        Ok(())
    }

    fn into_values(self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Integer(self.feature_id),
            integer(self.parent_id),
            text(self.namespace.as_deref()),
            Value::Text(self.name),
            Value::Text(self.datatype.to_owned()),
            integer(self.val_int),
            self.val_double.map_or(Value::Null, Value::Real),
            text(self.val_string.as_deref()),
            text(self.val_timestamp.as_deref()),
            text(self.val_uri.as_deref()),
            text(self.val_codespace.as_deref()),
            text(self.val_uom.as_deref()),
            self.val_array.unwrap_or(Value::Null),
            text(self.val_lod.as_deref()),
            integer(self.val_geometry_id),
            integer(self.val_implicitgeom_id),
            self.val_implicitgeom_refpoint.unwrap_or(Value::Null),
            integer(self.val_appearance_id),
            integer(self.val_address_id),
            integer(self.val_feature_id),
            integer(self.val_relation_type),
            Value::Null,
        ]
    }

    fn into_reference_values(self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Integer(self.feature_id),
            integer(self.parent_id),
            text(self.namespace.as_deref()),
            Value::Text(self.name),
            Value::Text(self.datatype.to_owned()),
            text(self.val_uri.as_deref()),
            self.val_array.unwrap_or(Value::Null),
            text(self.val_lod.as_deref()),
            self.val_implicitgeom_refpoint.unwrap_or(Value::Null),
            integer(self.val_relation_type),
        ]
    }
}

impl ImportHelper {
    /// Store `property` of feature `feature_id` below `parent_id`.
    pub(super) fn import_property(
        &mut self,
        property: &Property,
        feature_id: i64,
        parent_id: Option<i64>,
    ) -> Result<i64, ImportError> {
        let id = self.next_id(Table::Property);
        let mut row = PropertyRow::new(id, feature_id, parent_id, property);

        match &property.value {
            PropertyValue::Attribute(value) => row.attribute(value),
            PropertyValue::Complex(children) => {
                // Parents precede their children within the property batch.
                self.add_batch(ImporterKind::Property, row.into_values())?;
                for child in children {
                    self.import_property(child, feature_id, Some(id))?;
                }
                return Ok(id);
            }
            PropertyValue::Geometry(geometry) => {
                row.val_geometry_id = Some(self.import_geometry(&geometry.geometry, feature_id)?);
                row.lod(geometry.lod);
            }
            PropertyValue::ImplicitGeometry(implicit) => {
                row.placement(implicit)?;
                match &implicit.target {
                    ImplicitGeometryTarget::Inline(prototype) => {
                        row.val_implicitgeom_id = Some(self.import_implicit_geometry(prototype)?);
                    }
                    ImplicitGeometryTarget::Reference(reference) => {
                        return self.import_reference(
                            row,
                            ObjectKind::ImplicitGeometry,
                            reference,
                        );
                    }
                }
            }
            PropertyValue::Feature(link) => {
                row.val_relation_type = Some(link.relation_type());
                match link {
                    FeatureProperty::Inline(child) => {
                        row.val_feature_id = Some(self.import_feature(child)?);
                    }
                    FeatureProperty::Reference(reference) => {
                        return self.import_reference(row, ObjectKind::Feature, reference);
                    }
                }
            }
            PropertyValue::Address(link) => match link {
                AddressProperty::Inline(address) => {
                    row.val_address_id = Some(self.import_address(address)?);
                }
                AddressProperty::Reference(reference) => {
                    return self.import_reference(row, ObjectKind::Address, reference);
                }
            },
            PropertyValue::Appearance(appearance) => {
                row.val_appearance_id = Some(self.import_appearance(appearance, feature_id)?);
            }
        }

        self.add_batch(ImporterKind::Property, row.into_values())?;
        Ok(id)
    }

    /// Write a property whose foreign key is filled in during resolution.
    fn import_reference(
        &mut self,
        mut row: PropertyRow,
        kind: ObjectKind,
        reference: &Reference,
    ) -> Result<i64, ImportError> {
        let id = row.id;
        row.val_uri = Some(reference.href().to_owned());
        self.add_batch(ImporterKind::ReferenceProperty, row.into_reference_values())?;
        self.cache_reference(kind, Some(reference), id);
        Ok(id)
    }
}
