//! Interpretation of Frost responses.
//!
//! Frost returns JSON-LD envelopes with a `data` array. For sources each
//! item is a station with a GeoJSON point geometry (`[lon, lat]`). For
//! observations each item carries a `referenceTime` and a list of
//! observed values, several of which may share an element id with
//! different time offsets.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use power_map_consumption_models::{Coordinate, YearMonth};
use power_map_weather_models::{
    MAX_AIR_TEMPERATURE, MEAN_AIR_TEMPERATURE, MEAN_CLOUD_AREA_FRACTION, MEAN_TEMPERATURE_OFFSET,
    MIN_AIR_TEMPERATURE, MonthlyWeather, Observation, ObservationSet, WeatherStation,
};

use crate::WeatherError;

fn data_array(response: &serde_json::Value) -> Result<&Vec<serde_json::Value>, WeatherError> {
    response
        .get("data")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| WeatherError::Service {
            message: "response has no 'data' array".to_string(),
        })
}

/// Parses a sources response into stations.
///
/// Entries without an id or a `[lon, lat]` point geometry are skipped.
///
/// # Errors
///
/// Returns [`WeatherError::Service`] if the response has no `data` array.
pub fn parse_stations(response: &serde_json::Value) -> Result<Vec<WeatherStation>, WeatherError> {
    let data = data_array(response)?;

    let mut skipped = 0usize;
    let stations: Vec<WeatherStation> = data
        .iter()
        .filter_map(|item| {
            let station = parse_station(item);
            if station.is_none() {
                skipped += 1;
            }
            station
        })
        .collect();

    if skipped > 0 {
        log::debug!("Skipped {skipped} sources without id or point geometry");
    }

    Ok(stations)
}

fn parse_station(item: &serde_json::Value) -> Option<WeatherStation> {
    let id = item.get("id")?.as_str()?;
    let coordinates = item.get("geometry")?.get("coordinates")?.as_array()?;
    let longitude = coordinates.first()?.as_f64()?;
    let latitude = coordinates.get(1)?.as_f64()?;

    Some(WeatherStation {
        id: id.to_string(),
        name: item.get("name").and_then(|n| n.as_str()).map(String::from),
        location: Coordinate::from_parts(Some(latitude), Some(longitude))?,
    })
}

/// Reduces an observations response to one summary per calendar month,
/// in chronological order.
///
/// Mean temperature is taken only from the observation with the
/// `PT6H` time offset. When several items fall in the same month, the
/// first non-missing value of each field wins. Items whose reference
/// time cannot be parsed are skipped.
///
/// # Errors
///
/// * [`WeatherError::Service`] if the response has no `data` array
/// * [`WeatherError::Json`] if an item does not match the observation shape
pub fn monthly_weather(response: &serde_json::Value) -> Result<Vec<MonthlyWeather>, WeatherError> {
    let data = data_array(response)?;
    let mut months: BTreeMap<YearMonth, MonthlyWeather> = BTreeMap::new();

    for item in data {
        let set: ObservationSet = serde_json::from_value(item.clone())?;

        let Some(date) = parse_reference_date(&set.reference_time) else {
            log::warn!("Skipping observations with reference time '{}'", set.reference_time);
            continue;
        };

        let year_month = YearMonth::from_date(date);
        let summary = summarize(year_month, &set.observations);

        months
            .entry(year_month)
            .and_modify(|existing| existing.fill_missing_from(&summary))
            .or_insert(summary);
    }

    log::debug!("Extracted weather for {} months", months.len());

    Ok(months.into_values().collect())
}

fn summarize(year_month: YearMonth, observations: &[Observation]) -> MonthlyWeather {
    let first = |element: &str, offset: Option<&str>| {
        observations
            .iter()
            .find(|o| {
                o.element_id == element
                    && offset.is_none_or(|offset| o.time_offset.as_deref() == Some(offset))
            })
            .and_then(|o| o.value)
    };

    MonthlyWeather {
        mean_air_temp: first(MEAN_AIR_TEMPERATURE, Some(MEAN_TEMPERATURE_OFFSET)),
        min_air_temp: first(MIN_AIR_TEMPERATURE, None),
        max_air_temp: first(MAX_AIR_TEMPERATURE, None),
        cloud_area_fraction: first(MEAN_CLOUD_AREA_FRACTION, None),
        ..MonthlyWeather::empty(year_month)
    }
}

/// Date part of an ISO 8601 reference time (`2014-01-01T00:00:00.000Z`).
fn parse_reference_date(reference_time: &str) -> Option<NaiveDate> {
    let date = reference_time.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_stations_with_lon_lat_geometry() {
        let response = json!({
            "data": [
                {
                    "id": "SN18700",
                    "name": "OSLO - BLINDERN",
                    "geometry": { "@type": "Point", "coordinates": [10.72, 59.9423] }
                },
                { "id": "SN18701", "name": "OSLO - NO GEOMETRY" },
                {
                    "id": "SN18269",
                    "geometry": { "@type": "Point", "coordinates": [10.8123, 59.9] }
                }
            ]
        });

        let stations = parse_stations(&response).unwrap();

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].id, "SN18700");
        assert_eq!(stations[0].name.as_deref(), Some("OSLO - BLINDERN"));
        assert_eq!(stations[0].location, Coordinate::new(59.9423, 10.72));
        assert_eq!(stations[1].name, None);
    }

    #[test]
    fn missing_data_array_is_service_error() {
        let err = parse_stations(&json!({ "error": {} })).unwrap_err();
        assert!(matches!(err, WeatherError::Service { .. }));
    }

    fn obs(element: &str, value: f64, offset: &str) -> serde_json::Value {
        json!({ "elementId": element, "value": value, "unit": "degC", "timeOffset": offset })
    }

    #[test]
    fn extracts_monthly_fields() {
        let response = json!({
            "data": [
                {
                    "sourceId": "SN18700:0",
                    "referenceTime": "2014-01-01T00:00:00.000Z",
                    "observations": [
                        obs(MEAN_AIR_TEMPERATURE, -3.5, "PT0H"),
                        obs(MEAN_AIR_TEMPERATURE, -3.1, "PT6H"),
                        obs(MIN_AIR_TEMPERATURE, -15.0, "PT18H"),
                        obs(MAX_AIR_TEMPERATURE, 6.2, "PT18H"),
                        obs(MEAN_CLOUD_AREA_FRACTION, 6.0, "PT0H")
                    ]
                }
            ]
        });

        let months = monthly_weather(&response).unwrap();

        assert_eq!(months.len(), 1);
        let january = &months[0];
        assert_eq!(january.year_month.to_string(), "2014-01");
        assert_eq!(january.month, 1);
        assert_eq!(january.mean_air_temp, Some(-3.1));
        assert_eq!(january.min_air_temp, Some(-15.0));
        assert_eq!(january.max_air_temp, Some(6.2));
        assert_eq!(january.cloud_area_fraction, Some(6.0));
    }

    #[test]
    fn mean_without_six_hour_offset_is_missing() {
        let response = json!({
            "data": [{
                "referenceTime": "2014-02-01T00:00:00.000Z",
                "observations": [obs(MEAN_AIR_TEMPERATURE, 1.0, "PT0H")]
            }]
        });

        let months = monthly_weather(&response).unwrap();
        assert_eq!(months[0].mean_air_temp, None);
    }

    #[test]
    fn first_non_missing_value_per_month_wins() {
        let response = json!({
            "data": [
                {
                    "referenceTime": "2014-03-01T00:00:00.000Z",
                    "observations": [obs(MIN_AIR_TEMPERATURE, -4.0, "PT18H")]
                },
                {
                    "referenceTime": "2014-03-01T06:00:00.000Z",
                    "observations": [
                        obs(MIN_AIR_TEMPERATURE, -9.0, "PT18H"),
                        obs(MEAN_AIR_TEMPERATURE, 2.5, "PT6H")
                    ]
                }
            ]
        });

        let months = monthly_weather(&response).unwrap();

        assert_eq!(months.len(), 1);
        assert_eq!(months[0].min_air_temp, Some(-4.0));
        assert_eq!(months[0].mean_air_temp, Some(2.5));
    }

    #[test]
    fn months_are_chronological_and_bad_times_skipped() {
        let response = json!({
            "data": [
                { "referenceTime": "2015-01-01T00:00:00.000Z", "observations": [] },
                { "referenceTime": "yesterday", "observations": [] },
                { "referenceTime": "2014-12-01T00:00:00.000Z", "observations": [] }
            ]
        });

        let months = monthly_weather(&response).unwrap();
        let labels: Vec<String> = months.iter().map(|m| m.year_month.to_string()).collect();
        assert_eq!(labels, ["2014-12", "2015-01"]);
    }
}
