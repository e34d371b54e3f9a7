//! Nearest weather station per cached address.

use std::collections::BTreeMap;
use std::path::PathBuf;

use power_map_consumption_models::Coordinate;
use power_map_geocoder::GeocodeCache;
use power_map_spatial::match_station;
use power_map_weather::FrostClient;
use power_map_weather_models::WeatherStation;
use serde::Serialize;

use crate::{PipelineError, output::write_json};

/// The station allocated to one address. All fields are `None` when the
/// address has no location or there are no stations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationAllocation {
    /// Nearest station identifier.
    pub station_id: Option<String>,
    /// Location of the nearest station.
    pub station_location: Option<Coordinate>,
    /// Location of the address.
    pub address_location: Option<Coordinate>,
    /// Distance in degree space.
    pub distance: Option<f64>,
}

/// Allocates the nearest station to every cached address, keyed by
/// address.
#[must_use]
pub fn allocate_stations(
    cache: &GeocodeCache,
    stations: &[WeatherStation],
) -> BTreeMap<String, StationAllocation> {
    let allocations: BTreeMap<String, StationAllocation> = cache
        .iter()
        .map(|(address, entry)| {
            let location = entry.coordinate();
            let allocation = match_station(location, stations).map_or_else(
                || StationAllocation {
                    address_location: location,
                    ..StationAllocation::default()
                },
                |m| StationAllocation {
                    station_id: Some(m.station_id),
                    station_location: Some(m.station_location),
                    address_location: Some(m.address_location),
                    distance: Some(m.distance),
                },
            );
            (address.to_string(), allocation)
        })
        .collect();

    let allocated = allocations
        .values()
        .filter(|a| a.station_id.is_some())
        .count();
    log::info!(
        "Allocated stations to {allocated}/{} addresses from {} stations",
        allocations.len(),
        stations.len()
    );

    allocations
}

/// Inputs and outputs of the station allocation use case.
#[derive(Debug, Clone)]
pub struct StationOptions {
    /// Address cache written by the geocode step.
    pub cache: PathBuf,
    /// Station name filter; the configured filter when `None`.
    pub name_filter: Option<String>,
    /// JSON file to write.
    pub output: PathBuf,
}

/// Fetches the station list once, allocates the nearest station to every
/// cached address and writes the allocation JSON.
///
/// # Errors
///
/// * If the cache cannot be read
/// * If the station list cannot be fetched
/// * If the output cannot be written
#[allow(clippy::future_not_send)]
pub async fn run(
    options: &StationOptions,
    client: &FrostClient,
) -> Result<BTreeMap<String, StationAllocation>, PipelineError> {
    let cache = GeocodeCache::load(&options.cache)?;

    let filter = options
        .name_filter
        .as_deref()
        .unwrap_or(&client.config().station_name_filter);
    let stations = client.sources(filter).await?;

    let allocations = allocate_stations(&cache, &stations);
    write_json(&options.output, &allocations)?;

    Ok(allocations)
}
