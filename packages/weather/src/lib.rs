#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the MET Norway Frost weather API.
//!
//! Provides the station list used for nearest-station matching and the
//! monthly observations joined to consumption for correlation. Network
//! access is confined to [`client::FrostClient`]; everything that
//! interprets a response is a pure function over `serde_json::Value` so
//! it can be tested without the network.

pub mod client;
pub mod config;
pub mod monthly;
pub mod retry;

pub use client::{Credentials, FrostClient};
pub use config::FrostConfig;
pub use monthly::{monthly_weather, parse_stations};

/// Environment variable holding the Frost client id.
pub const CLIENT_ID_VAR: &str = "FROST_CLIENT_ID";

/// Environment variable holding the Frost client secret.
pub const CLIENT_SECRET_VAR: &str = "FROST_CLIENT_SECRET";

/// Errors that can occur while talking to the weather service.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with an error or an unexpected payload.
    #[error("Weather service error: {message}")]
    Service {
        /// Description of the failure.
        message: String,
    },

    /// A required credential environment variable is not set.
    #[error("Missing credentials: environment variable {var} is not set")]
    MissingCredentials {
        /// Name of the missing variable.
        var: &'static str,
    },

    /// The embedded service configuration is invalid.
    #[error("Invalid weather service config: {0}")]
    Config(#[from] toml::de::Error),
}
