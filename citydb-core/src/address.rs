use geo::MultiPoint;
use serde::{Deserialize, Serialize};

/// A postal address.
///
/// Addresses carry their own source identifier so that several features can
/// share one address by reference.
///
/// # Examples
/// ```
/// use citydb_core::Address;
///
/// let address = Address::new()
///     .with_object_id("addr-1")
///     .with_street("Unter den Linden", Some("1"));
/// assert_eq!(address.street.as_deref(), Some("Unter den Linden"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Source identifier used to resolve references.
    #[serde(default)]
    pub object_id: Option<String>,
    /// External identifier.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Street name.
    #[serde(default)]
    pub street: Option<String>,
    /// House number.
    #[serde(default)]
    pub house_number: Option<String>,
    /// Post office box.
    #[serde(default)]
    pub po_box: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub zip_code: Option<String>,
    /// City or locality.
    #[serde(default)]
    pub city: Option<String>,
    /// State or administrative area.
    #[serde(default)]
    pub state: Option<String>,
    /// Country.
    #[serde(default)]
    pub country: Option<String>,
    /// Unstructured address lines.
    #[serde(default)]
    pub free_text: Vec<String>,
    /// Locations associated with the address.
    #[serde(default)]
    pub location: Option<MultiPoint<f64>>,
}

impl Address {
    /// Create an empty address.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source identifier.
    #[must_use]
    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    /// Set the street and an optional house number.
    #[must_use]
    pub fn with_street(mut self, street: impl Into<String>, house_number: Option<&str>) -> Self {
        self.street = Some(street.into());
        self.house_number = house_number.map(str::to_owned);
        self
    }
}
