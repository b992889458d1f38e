//! Appearances, surface data, texture images and their join rows.

use citydb_core::{
    Appearance, ObjectKind, Reference, SurfaceData, SurfaceDataContent, SurfaceDataProperty,
    Table, Texture,
};
use rusqlite::types::Value;

use super::helper::{integer, json_column, text};
use super::{ImportError, ImportHelper, ImporterKind};

impl ImportHelper {
    /// Store an appearance of feature `feature_id` with its surface data.
    pub(super) fn import_appearance(
        &mut self,
        appearance: &Appearance,
        feature_id: i64,
    ) -> Result<i64, ImportError> {
        let id = self.next_id(Table::Appearance);
        self.add_batch(
            ImporterKind::Appearance,
            vec![
                Value::Integer(id),
                text(appearance.object_id.as_deref()),
                text(appearance.identifier.as_deref()),
                text(appearance.theme.as_deref()),
                Value::Integer(0),
                Value::Integer(feature_id),
                Value::Null,
            ],
        )?;

        for member in &appearance.surface_data {
            let join_id = self.next_id(Table::AppearToSurfaceData);
            let surface_data_id = match member {
                SurfaceDataProperty::Inline(surface_data) => {
                    Some(self.import_surface_data(surface_data)?)
                }
                SurfaceDataProperty::Reference(reference) => {
                    self.cache_reference(ObjectKind::SurfaceData, Some(reference), join_id);
                    None
                }
            };
            self.add_batch(
                ImporterKind::AppearToSurfaceData,
                vec![
                    Value::Integer(join_id),
                    integer(surface_data_id),
                    Value::Integer(id),
                ],
            )?;
        }
        Ok(id)
    }

    fn import_surface_data(&mut self, surface_data: &SurfaceData) -> Result<i64, ImportError> {
        let id = self.next_id(Table::SurfaceData);
        let (diffuse_color, transparency, texture_type, wrap_mode) = match &surface_data.content {
            SurfaceDataContent::Material(material) => (
                match &material.diffuse_color {
                    Some(color) => json_column(Table::SurfaceData, "x3d_diffuse_color", color)?,
                    None => Value::Null,
                },
                material.transparency.map_or(Value::Null, Value::Real),
                Value::Null,
                Value::Null,
            ),
            SurfaceDataContent::Texture(texture) => {
                self.import_texture_image(texture)?;
                (
                    Value::Null,
                    Value::Null,
                    text(texture.texture_type.as_deref()),
                    text(texture.wrap_mode.as_deref()),
                )
            }
        };
        self.add_batch(
            ImporterKind::SurfaceData,
            vec![
                Value::Integer(id),
                text(surface_data.object_id.as_deref()),
                text(surface_data.identifier.as_deref()),
                Value::Integer(i64::from(surface_data.is_front)),
                Value::Text(surface_data.content.type_name().to_owned()),
                diffuse_color,
                transparency,
                texture_type,
                wrap_mode,
            ],
        )?;
        self.cache_target(
            ObjectKind::SurfaceData,
            surface_data.object_id.as_deref(),
            id,
        );
        if let SurfaceDataContent::Texture(texture) = &surface_data.content {
            self.cache_reference(
                ObjectKind::TextureImage,
                Some(&Reference::new(texture.image_uri.as_str())),
                id,
            );
        }
        Ok(id)
    }

    /// Write the image of `texture` once per URI and session.
    fn import_texture_image(&mut self, texture: &Texture) -> Result<(), ImportError> {
        let reference = Reference::new(texture.image_uri.as_str());
        let Some(uri) = reference.target_id() else {
            return Ok(());
        };
        if self.texture_image(uri).is_some() {
            return Ok(());
        }
        let id = self.next_id(Table::TexImage);
        self.add_batch(
            ImporterKind::TextureImage,
            vec![
                Value::Integer(id),
                Value::Text(uri.to_owned()),
                text(texture.mime_type.as_deref()),
            ],
        )?;
        self.cache_target(ObjectKind::TextureImage, Some(uri), id);
        self.remember_texture_image(uri, id);
        Ok(())
    }
}
