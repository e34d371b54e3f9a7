#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! City district (bydel) attribute types.
//!
//! A district is a named administrative subdivision of the city. The
//! polygon geometry lives in `power_map_spatial`; this crate only carries
//! the attributes that are attached to enriched consumption records.

use serde::{Deserialize, Serialize};

/// Topology property holding the district display name.
pub const NAME_PROPERTY: &str = "BYDELSNAVN";

/// Topology property holding the administrative district code.
pub const CODE_PROPERTY: &str = "BYDEL";

/// Topology property holding the combined-group code.
pub const COMBINED_PROPERTY: &str = "Kombinert";

/// The attributes of a single district polygon.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DistrictAttributes {
    /// Display name (e.g. "Frogner").
    #[serde(rename = "BYDELSNAVN")]
    pub name: String,
    /// Administrative district code (e.g. "030105").
    #[serde(rename = "BYDEL")]
    pub code: String,
    /// Combined-group code used to merge small districts on maps.
    #[serde(rename = "Kombinert")]
    pub combined: String,
}

impl DistrictAttributes {
    /// Creates a new set of district attributes.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        combined: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            combined: combined.into(),
        }
    }
}

impl std::fmt::Display for DistrictAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_topology_property_names() {
        let attrs = DistrictAttributes::new("Frogner", "030105", "Frogner");
        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json[NAME_PROPERTY], "Frogner");
        assert_eq!(json[CODE_PROPERTY], "030105");
        assert_eq!(json[COMBINED_PROPERTY], "Frogner");
    }

    #[test]
    fn display_includes_code() {
        let attrs = DistrictAttributes::new("Sagene", "030103", "Sagene");
        assert_eq!(attrs.to_string(), "Sagene (030103)");
    }
}
