//! Compile-time embedded Nominatim configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::GeocodeError;

const NOMINATIM_TOML: &str = include_str!("../services/nominatim.toml");

/// Nominatim endpoint, query suffix and request policy.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimConfig {
    /// Unique identifier (`"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
    pub base_url: String,
    /// City appended to every query.
    pub city: String,
    /// Country appended to every query.
    pub country: String,
    /// Minimum delay between requests in milliseconds.
    pub rate_limit_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// `User-Agent` header; the public instance rejects anonymous clients.
    pub user_agent: String,
}

const fn default_timeout_secs() -> u64 {
    30
}

impl NominatimConfig {
    /// Loads the embedded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if the embedded TOML is malformed.
    pub fn embedded() -> Result<Self, GeocodeError> {
        Self::from_toml(NOMINATIM_TOML)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if the TOML is malformed or a
    /// required field is missing.
    pub fn from_toml(text: &str) -> Result<Self, GeocodeError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Free-form query for a street address: `"{address}, {city}, {country}"`.
    #[must_use]
    pub fn query_for(&self, address: &str) -> String {
        format!("{}, {}, {}", address.trim(), self.city, self.country)
    }

    /// Minimum delay between requests.
    #[must_use]
    pub const fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
