//! Implicit geometry prototypes.

use citydb_core::{ImplicitGeometry, ObjectKind, Table};
use rusqlite::types::Value;

use super::helper::{integer, text};
use super::{ImportError, ImportHelper, ImporterKind};

impl ImportHelper {
    /// Store an inline prototype and register it as a reference target.
    pub(super) fn import_implicit_geometry(
        &mut self,
        prototype: &ImplicitGeometry,
    ) -> Result<i64, ImportError> {
        let relative_geometry_id = match &prototype.relative_geometry {
            Some(geometry) => Some(self.import_relative_geometry(geometry)?),
            None => None,
        };
        let id = self.next_id(Table::ImplicitGeometry);
        self.add_batch(
            ImporterKind::ImplicitGeometry,
            vec![
                Value::Integer(id),
                text(prototype.object_id.as_deref()),
                text(prototype.mime_type.as_deref()),
                text(prototype.library_object.as_deref()),
                integer(relative_geometry_id),
            ],
        )?;
        self.cache_target(
            ObjectKind::ImplicitGeometry,
            prototype.object_id.as_deref(),
            id,
        );
        Ok(id)
    }
}
