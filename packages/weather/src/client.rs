//! Authenticated Frost HTTP client.

use chrono::NaiveDate;
use power_map_weather_models::WeatherStation;

use crate::{
    CLIENT_ID_VAR, CLIENT_SECRET_VAR, WeatherError, config::FrostConfig, monthly::parse_stations,
    retry,
};

/// Frost basic-auth credentials.
#[derive(Clone)]
pub struct Credentials {
    /// Client id (basic-auth user name).
    pub client_id: String,
    /// Client secret (basic-auth password).
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Reads credentials from `FROST_CLIENT_ID` / `FROST_CLIENT_SECRET`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::MissingCredentials`] naming the first
    /// variable that is unset or empty.
    pub fn from_env() -> Result<Self, WeatherError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, WeatherError> {
        let read = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(WeatherError::MissingCredentials { var })
        };

        Ok(Self {
            client_id: read(CLIENT_ID_VAR)?,
            client_secret: read(CLIENT_SECRET_VAR)?,
        })
    }
}

/// Client for the Frost sources and observations endpoints.
#[derive(Debug, Clone)]
pub struct FrostClient {
    client: reqwest::Client,
    config: FrostConfig,
    credentials: Credentials,
}

impl FrostClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Http`] if the HTTP client cannot be built.
    pub fn new(config: FrostConfig, credentials: Credentials) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    /// Creates a client from the embedded config and environment
    /// credentials.
    ///
    /// # Errors
    ///
    /// * If the embedded config is malformed
    /// * If a credential variable is missing
    pub fn from_env() -> Result<Self, WeatherError> {
        Self::new(FrostConfig::embedded()?, Credentials::from_env()?)
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &FrostConfig {
        &self.config
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
    }

    /// Lists stations whose name matches `name_filter` (e.g. `"OSLO*"`).
    ///
    /// Stations without a geometry are skipped.
    ///
    /// # Errors
    ///
    /// * If the request fails after retries
    /// * If the response has no `data` array
    pub async fn sources(&self, name_filter: &str) -> Result<Vec<WeatherStation>, WeatherError> {
        let url = self.config.sources_url();
        log::info!("Fetching weather stations matching '{name_filter}'");

        let body = retry::send_json(
            || self.get(&url).query(&[("name", name_filter)]),
            self.config.max_retries,
        )
        .await?;

        let stations = parse_stations(&body)?;
        log::info!("Fetched {} weather stations", stations.len());

        Ok(stations)
    }

    /// Fetches raw observations for `sources` and `elements` between
    /// `start` and `end`.
    ///
    /// # Errors
    ///
    /// * If the request fails after retries
    /// * If the service rejects the query (e.g. unknown element)
    pub async fn observations(
        &self,
        sources: &[&str],
        elements: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<serde_json::Value, WeatherError> {
        let url = self.config.observations_url();
        let params = observation_params(sources, elements, start, end);

        log::info!(
            "Fetching observations for {} ({} elements, {})",
            params[0].1,
            elements.len(),
            params[2].1
        );

        retry::send_json(|| self.get(&url).query(&params), self.config.max_retries).await
    }
}

/// Query parameters for the observations endpoint.
fn observation_params(
    sources: &[&str],
    elements: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> [(&'static str, String); 3] {
    [
        ("sources", sources.join(",")),
        ("elements", elements.join(",")),
        (
            "referencetime",
            format!("{}/{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use power_map_weather_models::MONTHLY_ELEMENTS;

    #[test]
    fn credentials_require_both_variables() {
        let err = Credentials::from_lookup(|var| {
            (var == CLIENT_ID_VAR).then(|| "id".to_string())
        })
        .unwrap_err();
        assert!(matches!(
            err,
            WeatherError::MissingCredentials { var } if var == CLIENT_SECRET_VAR
        ));

        let err = Credentials::from_lookup(|_| Some("  ".to_string())).unwrap_err();
        assert!(matches!(
            err,
            WeatherError::MissingCredentials { var } if var == CLIENT_ID_VAR
        ));
    }

    #[test]
    fn credentials_read_from_lookup() {
        let creds = Credentials::from_lookup(|var| Some(format!("{var}-value"))).unwrap();
        assert_eq!(creds.client_id, "FROST_CLIENT_ID-value");
        assert_eq!(creds.client_secret, "FROST_CLIENT_SECRET-value");
        assert!(!format!("{creds:?}").contains("FROST_CLIENT_SECRET-value"));
    }

    #[test]
    fn builds_observation_query() {
        let params = observation_params(
            &["SN18700"],
            MONTHLY_ELEMENTS,
            NaiveDate::from_ymd_opt(2014, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
        );

        assert_eq!(params[0], ("sources", "SN18700".to_string()));
        assert_eq!(
            params[1].1,
            "mean(air_temperature P1M),max(air_temperature P1M),\
             min(air_temperature P1M),mean(cloud_area_fraction P1M)"
        );
        assert_eq!(params[2], ("referencetime", "2014-01-01/2022-12-31".to_string()));
    }
}
