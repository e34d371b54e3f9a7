#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address geocoding for consumption records.
//!
//! Street addresses are resolved to coordinates with the public
//! Nominatim / `OpenStreetMap` search API, configured via
//! `services/nominatim.toml`. Nominatim allows **1 request per second**,
//! so results are kept in a [`cache::GeocodeCache`] persisted as JSON and
//! only addresses missing from the cache are ever queried.

pub mod cache;
pub mod config;
pub mod nominatim;

use std::time::Duration;

use async_trait::async_trait;
use power_map_consumption_models::Coordinate;
use thiserror::Error;

pub use cache::{CachedLocation, GeocodeCache};
pub use config::NominatimConfig;
pub use nominatim::NominatimClient;

/// A geocoding result with coordinates and the matched address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Resolved location (WGS84).
    pub location: Coordinate,
    /// The matched/canonical address returned by the geocoder.
    pub matched_address: Option<String>,
}

/// A service that resolves one address at a time.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves `address`. `Ok(None)` means the service found no match.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;

    /// Minimum delay between consecutive requests.
    fn rate_limit(&self) -> Duration {
        Duration::ZERO
    }
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Reading or writing the cache file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The embedded service configuration is invalid.
    #[error("Invalid geocoder config: {0}")]
    Config(#[from] toml::de::Error),
}
