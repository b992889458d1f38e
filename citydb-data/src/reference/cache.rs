//! Per-kind accumulator of targets and references collected between flushes.

use std::collections::HashMap;

use citydb_core::{ObjectKind, Reference};

/// In-memory buffer of `object id -> database id` targets and
/// `row id -> object id` references for one object kind.
///
/// The cache is owned by a single import session and handed to the
/// reference manager after each committed batch.
///
/// # Examples
/// ```
/// use citydb_core::{ObjectKind, Reference};
/// use citydb_data::ReferenceCache;
///
/// let mut cache = ReferenceCache::new(ObjectKind::Feature);
/// cache.put_target(Some("bldg-1"), 42);
/// cache.put_target(None, 43);
/// cache.put_reference(Some(&Reference::new("#bldg-1")), 100);
/// assert_eq!(cache.targets().get("bldg-1"), Some(&42));
/// assert_eq!(cache.references().get(&100).map(String::as_str), Some("bldg-1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCache {
    kind: ObjectKind,
    targets: HashMap<String, i64>,
    references: HashMap<i64, String>,
}

impl ReferenceCache {
    /// Create an empty cache for `kind`.
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            targets: HashMap::new(),
            references: HashMap::new(),
        }
    }

    /// Object kind whose entries the cache holds.
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Record that `object_id` was stored with database id `id`. Absent or
    /// empty identifiers are ignored.
    pub fn put_target(&mut self, object_id: Option<&str>, id: i64) {
        if let Some(object_id) = object_id.filter(|value| !value.is_empty()) {
            self.targets.insert(object_id.to_owned(), id);
        }
    }

    /// Record that row `id` refers to `reference`. Absent references are
    /// ignored.
    pub fn put_reference(&mut self, reference: Option<&Reference>, id: i64) {
        if let Some(target) = reference.and_then(Reference::target_id) {
            self.references.insert(id, target.to_owned());
        }
    }

    /// Buffered targets.
    pub const fn targets(&self) -> &HashMap<String, i64> {
        &self.targets
    }

    /// Buffered references.
    pub const fn references(&self) -> &HashMap<i64, String> {
        &self.references
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.references.is_empty()
    }

    /// Move the buffered targets out, leaving the target buffer empty.
    pub fn take_targets(&mut self) -> HashMap<String, i64> {
        std::mem::take(&mut self.targets)
    }

    /// Move the buffered references out, leaving the reference buffer empty.
    pub fn take_references(&mut self) -> HashMap<i64, String> {
        std::mem::take(&mut self.references)
    }

    /// Discard everything buffered.
    pub fn clear(&mut self) {
        self.targets.clear();
        self.references.clear();
    }
}
