//! Feature rows.

use citydb_core::{Feature, ObjectKind, Table};
use rusqlite::types::Value;

use super::helper::{json_column, text};
use super::{ImportError, ImportHelper, ImporterKind};

impl ImportHelper {
    /// Import `feature` with all of its properties and return its database
    /// id.
    ///
    /// Inline child features are imported recursively. References to objects
    /// that are not known yet are cached and resolved at the end of the run.
    pub fn import_feature(&mut self, feature: &Feature) -> Result<i64, ImportError> {
        let id = self.next_id(Table::Feature);
        let envelope = match feature.envelope() {
            Some(envelope) => json_column(Table::Feature, "envelope", &envelope)?,
            None => Value::Null,
        };
        self.add_batch(
            ImporterKind::Feature,
            vec![
                Value::Integer(id),
                text(feature.object_id.as_deref()),
                text(feature.identifier.as_deref()),
                text(feature.identifier_codespace.as_deref()),
                Value::Text(feature.feature_type.clone()),
                envelope,
                text(feature.creation_date.as_deref()),
                text(feature.termination_date.as_deref()),
                text(feature.lineage.as_deref()),
            ],
        )?;
        self.cache_target(ObjectKind::Feature, feature.object_id.as_deref(), id);

        for property in &feature.properties {
            self.import_property(property, id, None)?;
        }
        self.count_feature();
        Ok(id)
    }
}
