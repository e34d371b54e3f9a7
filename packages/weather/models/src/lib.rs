#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weather station and observation types.
//!
//! Stations and observations come from the Frost weather API. Stations
//! are matched to consumption addresses by nearest distance; monthly
//! observations are joined to monthly consumption for correlation.

use power_map_consumption_models::{Coordinate, YearMonth};
use serde::{Deserialize, Serialize};

/// A weather station with a known location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherStation {
    /// Station identifier (e.g. `"SN18700"`).
    pub id: String,
    /// Human-readable station name (e.g. "OSLO - BLINDERN").
    pub name: Option<String>,
    /// Station location.
    pub location: Coordinate,
}

/// The nearest station chosen for a point, with both locations recorded
/// for auditing the match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMatch {
    /// Identifier of the chosen station.
    pub station_id: String,
    /// Euclidean distance in degree space.
    pub distance: f64,
    /// Location of the chosen station.
    pub station_location: Coordinate,
    /// Location of the query point.
    pub address_location: Coordinate,
}

/// Element identifier for the monthly mean air temperature.
pub const MEAN_AIR_TEMPERATURE: &str = "mean(air_temperature P1M)";
/// Element identifier for the monthly minimum air temperature.
pub const MIN_AIR_TEMPERATURE: &str = "min(air_temperature P1M)";
/// Element identifier for the monthly maximum air temperature.
pub const MAX_AIR_TEMPERATURE: &str = "max(air_temperature P1M)";
/// Element identifier for the monthly mean cloud area fraction.
pub const MEAN_CLOUD_AREA_FRACTION: &str = "mean(cloud_area_fraction P1M)";

/// The time offset qualifier used for the monthly mean temperature.
pub const MEAN_TEMPERATURE_OFFSET: &str = "PT6H";

/// All elements requested for monthly weather.
pub const MONTHLY_ELEMENTS: &[&str] = &[
    MEAN_AIR_TEMPERATURE,
    MAX_AIR_TEMPERATURE,
    MIN_AIR_TEMPERATURE,
    MEAN_CLOUD_AREA_FRACTION,
];

/// A single observed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Element identifier (e.g. `"mean(air_temperature P1M)"`).
    pub element_id: String,
    /// Observed value.
    pub value: Option<f64>,
    /// Unit of the value (e.g. `"degC"`).
    #[serde(default)]
    pub unit: Option<String>,
    /// Optional time-offset qualifier (e.g. `"PT6H"`).
    #[serde(default)]
    pub time_offset: Option<String>,
}

/// All observations sharing one reference time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationSet {
    /// Station the observations were taken at (e.g. `"SN18700:0"`).
    #[serde(default)]
    pub source_id: Option<String>,
    /// ISO 8601 reference time (e.g. `"2014-01-01T00:00:00.000Z"`).
    pub reference_time: String,
    /// The observed values.
    #[serde(default)]
    pub observations: Vec<Observation>,
}

/// Monthly weather summary for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyWeather {
    /// The month.
    pub year_month: YearMonth,
    /// Month of year, 1-12.
    pub month: u32,
    /// Mean air temperature (degrees Celsius).
    pub mean_air_temp: Option<f64>,
    /// Minimum air temperature (degrees Celsius).
    pub min_air_temp: Option<f64>,
    /// Maximum air temperature (degrees Celsius).
    pub max_air_temp: Option<f64>,
    /// Mean cloud area fraction (oktas).
    pub cloud_area_fraction: Option<f64>,
}

impl MonthlyWeather {
    /// Creates an empty summary for `year_month`.
    #[must_use]
    pub const fn empty(year_month: YearMonth) -> Self {
        Self {
            year_month,
            month: year_month.month,
            mean_air_temp: None,
            min_air_temp: None,
            max_air_temp: None,
            cloud_area_fraction: None,
        }
    }

    /// Fills every missing field from `other`, keeping values already set.
    pub fn fill_missing_from(&mut self, other: &Self) {
        self.mean_air_temp = self.mean_air_temp.or(other.mean_air_temp);
        self.min_air_temp = self.min_air_temp.or(other.min_air_temp);
        self.max_air_temp = self.max_air_temp.or(other.max_air_temp);
        self.cloud_area_fraction = self.cloud_area_fraction.or(other.cloud_area_fraction);
    }
}
