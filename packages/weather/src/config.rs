//! Compile-time embedded Frost service configuration.
//!
//! The endpoint and request policy live in `services/frost.toml` and are
//! embedded with `include_str!`.

use std::time::Duration;

use serde::Deserialize;

use crate::WeatherError;

const FROST_TOML: &str = include_str!("../services/frost.toml");

/// Frost endpoint and request policy.
#[derive(Debug, Clone, Deserialize)]
pub struct FrostConfig {
    /// Unique identifier (`"frost"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// API base URL (e.g., `"https://frost.met.no"`).
    pub base_url: String,
    /// Station name pattern used when listing sources (e.g., `"OSLO*"`).
    pub station_name_filter: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_max_retries() -> u32 {
    4
}

impl FrostConfig {
    /// Loads the embedded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Config`] if the embedded TOML is malformed.
    pub fn embedded() -> Result<Self, WeatherError> {
        Self::from_toml(FROST_TOML)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Config`] if the TOML is malformed or a
    /// required field is missing.
    pub fn from_toml(text: &str) -> Result<Self, WeatherError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of the sources (station list) endpoint.
    #[must_use]
    pub fn sources_url(&self) -> String {
        format!("{}/sources/v0.jsonld", self.base_url.trim_end_matches('/'))
    }

    /// URL of the observations endpoint.
    #[must_use]
    pub fn observations_url(&self) -> String {
        format!(
            "{}/observations/v0.jsonld",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_parses() {
        let config = FrostConfig::embedded().unwrap();
        assert_eq!(config.id, "frost");
        assert!(!config.name.is_empty());
        assert!(config.base_url.starts_with("https://"));
        assert!(!config.station_name_filter.is_empty());
        assert!(config.timeout_secs > 0);
    }

    #[test]
    fn builds_endpoint_urls() {
        let config = FrostConfig::from_toml(
            r#"
            id = "frost"
            name = "Frost"
            base_url = "http://localhost:8080/"
            station_name_filter = "OSLO*"
            "#,
        )
        .unwrap();

        assert_eq!(config.sources_url(), "http://localhost:8080/sources/v0.jsonld");
        assert_eq!(
            config.observations_url(),
            "http://localhost:8080/observations/v0.jsonld"
        );
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn missing_base_url_is_config_error() {
        let err = FrostConfig::from_toml("id = \"frost\"\nname = \"Frost\"").unwrap_err();
        assert!(matches!(err, WeatherError::Config(_)));
    }
}
