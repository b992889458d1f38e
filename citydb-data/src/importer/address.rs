//! Address rows.

use citydb_core::{Address, ObjectKind, Table};
use rusqlite::types::Value;

use super::helper::{json_column, text};
use super::{ImportError, ImportHelper, ImporterKind};

impl ImportHelper {
    /// Store an inline address and register it as a reference target.
    pub(super) fn import_address(&mut self, address: &Address) -> Result<i64, ImportError> {
        let id = self.next_id(Table::Address);
        let free_text = if address.free_text.is_empty() {
            Value::Null
        } else {
            json_column(Table::Address, "free_text", &address.free_text)?
        };
        let multi_point = match &address.location {
            Some(points) => json_column(Table::Address, "multi_point", points)?,
            None => Value::Null,
        };
        self.add_batch(
            ImporterKind::Address,
            vec![
                Value::Integer(id),
                text(address.object_id.as_deref()),
                text(address.identifier.as_deref()),
                text(address.street.as_deref()),
                text(address.house_number.as_deref()),
                text(address.po_box.as_deref()),
                text(address.zip_code.as_deref()),
                text(address.city.as_deref()),
                text(address.state.as_deref()),
                text(address.country.as_deref()),
                free_text,
                multi_point,
            ],
        )?;
        self.cache_target(ObjectKind::Address, address.object_id.as_deref(), id);
        Ok(id)
    }
}
