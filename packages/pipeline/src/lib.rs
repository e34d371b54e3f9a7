#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Use cases of the consumption pipeline.
//!
//! Each module is one orchestrated use case: it loads reference data
//! once, enriches or cleans the record set, aggregates, and writes the
//! tables and `GeoJSON` handed to rendering.
//!
//! | Module | Use case |
//! |---|---|
//! | [`geocode`] | Geocode unique addresses, attach locations |
//! | [`enrich`] | Assign districts (and optionally stations) per record |
//! | [`stations`] | Nearest weather station per cached address |
//! | [`district_map`] | Per-district yearly sums and choropleth values |
//! | [`locations`] | Per-location category means (marker layer) |
//! | [`weather_correlation`] | Monthly consumption against weather |
//! | [`shares`] | Share of observations per category |
//!
//! Every use case has a pure core (tested directly) and a `run` function
//! that does the file and network I/O around it.

pub mod district_map;
pub mod enrich;
pub mod geocode;
pub mod locations;
pub mod output;
pub mod progress;
pub mod shares;
pub mod stations;
pub mod weather_correlation;

use power_map_consumption::DatasetError;
use power_map_geocoder::GeocodeError;
use power_map_spatial::SpatialError;
use power_map_weather::WeatherError;
use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading or writing a consumption dataset failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// The district topology could not be loaded.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// The weather service failed.
    #[error(transparent)]
    Weather(#[from] WeatherError),

    /// The geocoding service or its cache failed.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// Writing an output file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing an output file failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use power_map_consumption_models::{ConsumptionRecord, Coordinate, EnrichedRecord};
    use power_map_spatial::{District, DistrictIndex, load_topology};

    /// Frogner spans lat 59.91..59.93, lon 10.70..10.72; Sagene spans
    /// lat 59.93..59.95, lon 10.72..10.74.
    pub fn oslo_topology() -> String {
        serde_json::json!({
            "type": "Topology",
            "objects": {
                "Bydeler": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {
                            "type": "Polygon",
                            "arcs": [[0]],
                            "properties": {"BYDELSNAVN": "Frogner", "BYDEL": "030105", "Kombinert": "Frogner"}
                        },
                        {
                            "type": "Polygon",
                            "arcs": [[1]],
                            "properties": {"BYDELSNAVN": "Sagene", "BYDEL": "030103", "Kombinert": "Sagene"}
                        }
                    ]
                }
            },
            "arcs": [
                [[10.70, 59.91], [10.72, 59.91], [10.72, 59.93], [10.70, 59.93], [10.70, 59.91]],
                [[10.72, 59.93], [10.74, 59.93], [10.74, 59.95], [10.72, 59.95], [10.72, 59.93]]
            ]
        })
        .to_string()
    }

    pub fn oslo_districts() -> Vec<District> {
        load_topology(&oslo_topology(), "Bydeler").unwrap()
    }

    pub fn oslo_index() -> DistrictIndex {
        DistrictIndex::new(oslo_districts())
    }

    pub fn record(
        address: &str,
        category: &str,
        date: (i32, u32, u32),
        value: Option<f64>,
        location: Option<(f64, f64)>,
    ) -> EnrichedRecord {
        EnrichedRecord::bare(ConsumptionRecord {
            address: address.to_string(),
            category: category.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            consumption_kwh: value,
            location: location.map(|(lat, lon)| Coordinate::new(lat, lon)),
        })
    }
}
