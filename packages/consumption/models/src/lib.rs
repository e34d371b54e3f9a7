#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Electricity consumption record types.
//!
//! A [`ConsumptionRecord`] is one reading from the municipal consumption
//! dataset. The pipeline progressively enriches records with a location,
//! a district and a nearest weather station, producing [`EnrichedRecord`]s
//! that are handed to cleaning and aggregation.

use std::str::FromStr;

use chrono::{Datelike as _, NaiveDate};
use power_map_district_models::DistrictAttributes;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A geographic location in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds a coordinate from optional parts. Either part missing (or
    /// not finite) yields `None`, the missing-coordinate sentinel.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Self::new(lat, lon))
            }
            _ => None,
        }
    }

    /// Euclidean distance in raw degree space. Not a geodesic distance.
    #[must_use]
    pub fn degree_distance(&self, other: &Self) -> f64 {
        (self.latitude - other.latitude).hypot(self.longitude - other.longitude)
    }
}

/// The electricity-consumption use classes present in the dataset.
///
/// The dataset labels categories in Norwegian; English names are accepted
/// as aliases when parsing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum ConsumptionCategory {
    /// Street and park lighting.
    #[serde(rename = "Belysning", alias = "Lighting")]
    #[strum(to_string = "Belysning", serialize = "Lighting")]
    Lighting,
    /// Traffic lights and traffic control equipment.
    #[serde(rename = "Trafikkstyring", alias = "Traffic Control")]
    #[strum(to_string = "Trafikkstyring", serialize = "Traffic Control")]
    TrafficControl,
    /// Parking meters.
    #[serde(rename = "P-automater", alias = "Parking Meters")]
    #[strum(to_string = "P-automater", serialize = "Parking Meters")]
    ParkingMeters,
    /// Electric vehicle charging stations.
    #[serde(rename = "Ladestasjoner", alias = "Charging Stations")]
    #[strum(to_string = "Ladestasjoner", serialize = "Charging Stations")]
    ChargingStations,
}

impl ConsumptionCategory {
    /// The four top categories, in presentation order.
    pub const ALL: &[Self] = &[
        Self::Lighting,
        Self::TrafficControl,
        Self::ParkingMeters,
        Self::ChargingStations,
    ];

    /// English display name.
    #[must_use]
    pub const fn english_name(self) -> &'static str {
        match self {
            Self::Lighting => "Lighting",
            Self::TrafficControl => "Traffic Control",
            Self::ParkingMeters => "Parking Meters",
            Self::ChargingStations => "Charging Stations",
        }
    }

    /// Returns `true` if `label` (as found in the dataset) names this
    /// category.
    #[must_use]
    pub fn matches(self, label: &str) -> bool {
        Self::from_str(label).is_ok_and(|parsed| parsed == self)
    }
}

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct YearMonth {
    /// Calendar year.
    pub year: i32,
    /// Month of year, 1-12.
    pub month: u32,
}

impl YearMonth {
    /// Returns the month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Error returned when a `YYYY-MM` period label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid year-month '{value}': expected YYYY-MM")]
pub struct InvalidYearMonthError {
    /// The rejected input.
    pub value: String,
}

impl FromStr for YearMonth {
    type Err = InvalidYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidYearMonthError {
            value: s.to_string(),
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year = year.parse::<i32>().map_err(|_| err())?;
        let month = month.parse::<u32>().map_err(|_| err())?;
        if !(1..=12).contains(&month) {
            return Err(err());
        }
        Ok(Self { year, month })
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for YearMonth {
    type Error = InvalidYearMonthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One row of the consumption dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    /// Street address; the geocoding key.
    pub address: String,
    /// Category label as it appears in the dataset (e.g. "Belysning").
    pub category: String,
    /// Reading date.
    pub date: NaiveDate,
    /// Consumption in kWh. `None` when missing or physically invalid.
    pub consumption_kwh: Option<f64>,
    /// Geocoded location, `None` when the address could not be located.
    pub location: Option<Coordinate>,
}

impl ConsumptionRecord {
    /// Calendar year of the reading.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Month of year of the reading, 1-12.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// Calendar month of the reading.
    #[must_use]
    pub fn year_month(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }

    /// The known top category of this record, if any.
    #[must_use]
    pub fn known_category(&self) -> Option<ConsumptionCategory> {
        ConsumptionCategory::from_str(&self.category).ok()
    }
}

/// A consumption record after district and station enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// The underlying reading.
    pub record: ConsumptionRecord,
    /// Containing district, `None` when outside every district or when
    /// the record has no location.
    pub district: Option<DistrictAttributes>,
    /// Nearest weather station identifier, if resolved.
    pub station_id: Option<String>,
}

impl EnrichedRecord {
    /// Wraps a record with no enrichment yet.
    #[must_use]
    pub const fn bare(record: ConsumptionRecord) -> Self {
        Self {
            record,
            district: None,
            station_id: None,
        }
    }

    /// District display name, if assigned.
    #[must_use]
    pub fn district_name(&self) -> Option<&str> {
        self.district.as_ref().map(|d| d.name.as_str())
    }
}
