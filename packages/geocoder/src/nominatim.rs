//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum.
//! The client does not sleep itself; callers pace requests using
//! [`Geocoder::rate_limit`].
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use async_trait::async_trait;
use power_map_consumption_models::Coordinate;

use crate::{GeocodeError, GeocodedAddress, Geocoder, config::NominatimConfig};

/// Free-form Nominatim search client.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    config: NominatimConfig,
}

impl NominatimClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(config: NominatimConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client, config })
    }

    /// Geocodes a free-form query.
    ///
    /// # Errors
    ///
    /// * [`GeocodeError::RateLimited`] on HTTP 429
    /// * [`GeocodeError::Http`] if the request fails or returns an error status
    /// * [`GeocodeError::Parse`] if the response is not a Nominatim result list
    pub async fn geocode_freeform(
        &self,
        query: &str,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let resp = self
            .client
            .get(&self.config.base_url)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_response(&body)
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let query = self.config.query_for(address);
        log::debug!("Nominatim query: {query}");
        self.geocode_freeform(&query).await
    }

    fn rate_limit(&self) -> Duration {
        self.config.rate_limit()
    }
}

/// Parses a Nominatim JSON response, taking the first result.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = parse_degrees(&first["lat"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Nominatim response".to_string(),
    })?;

    let lon = parse_degrees(&first["lon"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lon in Nominatim response".to_string(),
    })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedAddress {
        location: Coordinate::new(lat, lon),
        matched_address: display_name,
    }))
}

/// Nominatim returns coordinates as strings; numbers are accepted too.
fn parse_degrees(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "59.9138",
            "lon": "10.7387",
            "display_name": "1, Karl Johans gate, Sentrum, Oslo, 0154, Norge"
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.location.latitude - 59.9138).abs() < 1e-4);
        assert!((result.location.longitude - 10.7387).abs() < 1e-4);
        assert!(result.matched_address.unwrap().contains("Karl Johans gate"));
    }

    #[test]
    fn takes_first_of_several_results() {
        let body = serde_json::json!([
            { "lat": "59.91", "lon": "10.75" },
            { "lat": "60.00", "lon": "11.00" }
        ]);
        let result = parse_response(&body).unwrap().unwrap();
        assert_eq!(result.location, Coordinate::new(59.91, 10.75));
        assert_eq!(result.matched_address, None);
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_non_array_and_missing_coordinates() {
        assert!(matches!(
            parse_response(&serde_json::json!({ "error": "bad" })),
            Err(GeocodeError::Parse { .. })
        ));
        assert!(matches!(
            parse_response(&serde_json::json!([{ "lat": "59.9" }])),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
