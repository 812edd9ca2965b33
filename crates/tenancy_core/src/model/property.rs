//! Rental properties.

use crate::model::PropertyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown when a property has neither a name nor an address.
pub const UNTITLED_PROPERTY: &str = "Untitled property";

/// A rental property.
///
/// Records point at their property through [`crate::Record::property_id`];
/// the property itself holds no child list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Stable identifier.
    pub id: PropertyId,
    /// User-chosen name, may be empty.
    pub name: String,
    /// Street address, may be empty.
    pub address: String,
    /// When the property was created.
    pub created_at: DateTime<Utc>,
}

impl Property {
    /// Creates a property with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: PropertyId::new(),
            name: name.into(),
            address: address.into(),
            created_at,
        }
    }

    /// Name, else address, else [`UNTITLED_PROPERTY`].
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.address.is_empty() {
            &self.address
        } else {
            UNTITLED_PROPERTY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_fallbacks() {
        let now = Utc::now();
        assert_eq!(Property::new("Sunrise Apt", "1 Main St", now).display_name(), "Sunrise Apt");
        assert_eq!(Property::new("", "1 Main St", now).display_name(), "1 Main St");
        assert_eq!(Property::new("", "", now).display_name(), UNTITLED_PROPERTY);
    }
}
