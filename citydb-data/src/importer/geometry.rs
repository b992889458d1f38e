//! Geometry payload rows.

use citydb_core::Table;
use geo::Geometry;
use rusqlite::types::Value;

use super::helper::{integer, json_column};
use super::{ImportError, ImportHelper, ImporterKind};

impl ImportHelper {
    /// Store `geometry` owned by feature `feature_id` and return its id.
    pub(super) fn import_geometry(
        &mut self,
        geometry: &Geometry<f64>,
        feature_id: i64,
    ) -> Result<i64, ImportError> {
        let id = self.next_id(Table::GeometryData);
        let encoded = json_column(Table::GeometryData, "geometry", geometry)?;
        self.add_batch(
            ImporterKind::Geometry,
            vec![
                Value::Integer(id),
                encoded,
                Value::Null,
                integer(Some(feature_id)),
            ],
        )?;
        Ok(id)
    }

    /// Store the relative geometry of an implicit geometry prototype.
    pub(super) fn import_relative_geometry(
        &mut self,
        geometry: &Geometry<f64>,
    ) -> Result<i64, ImportError> {
        let id = self.next_id(Table::GeometryData);
        let encoded = json_column(Table::GeometryData, "implicit_geometry", geometry)?;
        self.add_batch(
            ImporterKind::Geometry,
            vec![Value::Integer(id), Value::Null, encoded, Value::Null],
        )?;
        Ok(id)
    }
}
