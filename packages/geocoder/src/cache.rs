//! Persistent address → location cache.
//!
//! Stored as a pretty-printed JSON object keyed by address:
//!
//! ```json
//! {
//!   "Karl Johans gate 1": { "latitude": 59.9138, "longitude": 10.7387 },
//!   "Ukjent vei 9": { "latitude": null, "longitude": null }
//! }
//! ```
//!
//! A `null` pair records that the address was queried and not found, so
//! it is not queried again.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use power_map_consumption_models::Coordinate;
use serde::{Deserialize, Serialize};

use crate::GeocodeError;

/// One cache entry. Both parts are `None` for an address with no match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedLocation {
    /// Latitude, or `None` when unresolved.
    pub latitude: Option<f64>,
    /// Longitude, or `None` when unresolved.
    pub longitude: Option<f64>,
}

impl CachedLocation {
    /// The entry as a coordinate, `None` unless both parts are present.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }
}

impl From<Option<Coordinate>> for CachedLocation {
    fn from(value: Option<Coordinate>) -> Self {
        Self {
            latitude: value.map(|c| c.latitude),
            longitude: value.map(|c| c.longitude),
        }
    }
}

/// Address → location cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeocodeCache {
    entries: BTreeMap<String, CachedLocation>,
}

impl GeocodeCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a cache from `path`. A missing file yields an empty cache.
    ///
    /// # Errors
    ///
    /// * [`GeocodeError::Io`] if the file exists but cannot be read
    /// * [`GeocodeError::Json`] if the file is not a valid cache
    pub fn load(path: &Path) -> Result<Self, GeocodeError> {
        if !path.exists() {
            log::info!("No geocode cache at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let text = std::fs::read_to_string(path)?;
        let cache = Self::from_json(&text)?;
        log::info!(
            "Loaded {} cached addresses from {}",
            cache.len(),
            path.display()
        );
        Ok(cache)
    }

    /// Parses a cache from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Json`] if the text is not a valid cache.
    pub fn from_json(text: &str) -> Result<Self, GeocodeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Writes the cache to `path` as pretty JSON, creating the parent
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), GeocodeError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Saved {} cached addresses to {}", self.len(), path.display());
        Ok(())
    }

    /// Raw entry for `address`, if it has been queried.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<&CachedLocation> {
        self.entries.get(address)
    }

    /// Resolved location for `address`. `None` for both unknown and
    /// unresolved addresses.
    #[must_use]
    pub fn location(&self, address: &str) -> Option<Coordinate> {
        self.get(address).and_then(CachedLocation::coordinate)
    }

    /// Records the outcome of a lookup.
    pub fn insert(&mut self, address: impl Into<String>, location: Option<Coordinate>) {
        self.entries.insert(address.into(), location.into());
    }

    /// Returns `true` if `address` has been queried before.
    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    /// Number of cached addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cached addresses with a resolved location.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.coordinate().is_some())
            .count()
    }

    /// Iterates entries in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CachedLocation)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Unique addresses from `addresses` that have not been queried yet,
    /// in first-appearance order. Blank addresses are ignored.
    #[must_use]
    pub fn missing<'a>(&self, addresses: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut seen = BTreeSet::new();
        addresses
            .into_iter()
            .map(str::trim)
            .filter(|a| !a.is_empty() && !self.contains(a) && seen.insert(*a))
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cache_json_with_null_entries() {
        let cache = GeocodeCache::from_json(
            r#"{
                "Karl Johans gate 1": { "latitude": 59.9138, "longitude": 10.7387 },
                "Ukjent vei 9": { "latitude": null, "longitude": null }
            }"#,
        )
        .unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.resolved_count(), 1);
        assert_eq!(
            cache.location("Karl Johans gate 1"),
            Some(Coordinate::new(59.9138, 10.7387))
        );
        assert!(cache.contains("Ukjent vei 9"));
        assert_eq!(cache.location("Ukjent vei 9"), None);
        assert_eq!(cache.location("Never queried"), None);
    }

    #[test]
    fn serializes_unresolved_as_null_pair() {
        let mut cache = GeocodeCache::new();
        cache.insert("Ukjent vei 9", None);
        let json = serde_json::to_value(&cache).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "Ukjent vei 9": { "latitude": null, "longitude": null } })
        );
    }

    #[test]
    fn missing_is_unique_and_ordered() {
        let mut cache = GeocodeCache::new();
        cache.insert("B", Some(Coordinate::new(1.0, 2.0)));

        let missing = cache.missing(["C", "B", "A", "C", " ", "A"]);
        assert_eq!(missing, ["C", "A"]);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("power_map_cache_{}", std::process::id()));
        let path = dir.join("address_geo_locations.json");

        let mut cache = GeocodeCache::new();
        cache.insert("Karl Johans gate 1", Some(Coordinate::new(59.9138, 10.7387)));
        cache.insert("Ukjent vei 9", None);
        cache.save(&path).unwrap();

        let loaded = GeocodeCache::load(&path).unwrap();
        assert_eq!(loaded, cache);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_is_empty() {
        let path = std::env::temp_dir().join("power_map_definitely_missing_cache.json");
        assert!(GeocodeCache::load(&path).unwrap().is_empty());
    }
}
