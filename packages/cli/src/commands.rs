//! One function per use case, shared by the subcommands and the
//! interactive menu. Each runs the pipeline step and prints a summary.

use std::path::{Path, PathBuf};
use std::time::Instant;

use power_map_cli_utils::{IndicatifProgress, MultiProgress};
use power_map_consumption_models::ConsumptionCategory;
use power_map_geocoder::{NominatimClient, NominatimConfig};
use power_map_pipeline::{
    district_map::{self, DistrictMapOptions},
    enrich::{self, EnrichOptions},
    geocode::{self, GeocodeOptions},
    locations::{self, LocationsOptions},
    shares::{self, SharesOptions},
    stations::{self, StationOptions},
    weather_correlation::{self, WeatherCorrelationOptions},
};
use power_map_weather::FrostClient;

/// Raw `;`-separated export from the municipality.
pub const RAW_CSV: &str = "data/stromforbruk.csv";
/// Address to location cache.
pub const GEO_CACHE: &str = "data/address_geo_locations.json";
/// Records with locations attached.
pub const LOCATED_CSV: &str = "data/stromforbruk_with_geo.csv";
/// District topology.
pub const TOPOLOGY: &str = "data/Bydeler_Oslo_m_marka.json";
/// Records with districts (and stations) attached.
pub const ENRICHED_CSV: &str = "data/stromforbruk_with_bydel.csv";
/// Nearest station per address.
pub const STATIONS_JSON: &str = "data/address_closest_weather_stations.json";
/// Directory for tables and `GeoJSON`.
pub const OUTPUT_DIR: &str = "output";

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// File-name form of a category (`charging_stations`).
fn slug(category: ConsumptionCategory) -> String {
    category.english_name().to_lowercase().replace(' ', "_")
}

/// Geocodes the raw export.
///
/// # Errors
///
/// Returns an error if the geocoder cannot be configured or the step fails.
#[allow(clippy::future_not_send)]
pub async fn geocode(options: &GeocodeOptions, multi: &MultiProgress) -> CommandResult {
    let start = Instant::now();
    let geocoder = NominatimClient::new(NominatimConfig::embedded()?)?;
    let progress = IndicatifProgress::lookups_bar(multi, "Geocoding addresses");

    let summary = geocode::run(options, &geocoder, progress.as_ref()).await?;

    println!(
        "Geocoded {} new addresses ({} resolved); {}/{} records located in {:.1}s",
        summary.lookups.queried,
        summary.lookups.resolved,
        summary.located,
        summary.records,
        start.elapsed().as_secs_f64()
    );
    println!("Wrote {}", options.output.display());
    Ok(())
}

/// Assigns districts, and stations when `with_stations` is set.
///
/// # Errors
///
/// Returns an error if Frost credentials are missing (with stations) or
/// the step fails.
#[allow(clippy::future_not_send)]
pub async fn allocate_districts(
    options: &EnrichOptions,
    with_stations: bool,
    multi: &MultiProgress,
) -> CommandResult {
    let client = if with_stations {
        Some(FrostClient::from_env()?)
    } else {
        None
    };
    let progress = IndicatifProgress::records_bar(multi, "Allocating districts");

    let summary = enrich::run(options, client.as_ref(), progress.as_ref()).await?;

    println!(
        "{} records: {} in a district, {} outside, {} without location, {} with station",
        summary.records,
        summary.with_district,
        summary.outside_districts,
        summary.missing_location,
        summary.with_station
    );
    println!("Wrote {}", options.output.display());
    Ok(())
}

/// Allocates the nearest weather station per cached address.
///
/// # Errors
///
/// Returns an error if Frost credentials are missing or the step fails.
#[allow(clippy::future_not_send)]
pub async fn allocate_stations(options: &StationOptions) -> CommandResult {
    let client = FrostClient::from_env()?;
    let allocations = stations::run(options, &client).await?;

    let allocated = allocations
        .values()
        .filter(|a| a.station_id.is_some())
        .count();
    println!(
        "Allocated a station to {allocated}/{} addresses",
        allocations.len()
    );
    println!("Wrote {}", options.output.display());
    Ok(())
}

/// Options for the district map of `category` with outputs in `output_dir`.
#[must_use]
pub fn district_map_options(
    input: PathBuf,
    topology: PathBuf,
    object_name: String,
    category: ConsumptionCategory,
    output_dir: &Path,
) -> DistrictMapOptions {
    let slug = slug(category);
    DistrictMapOptions {
        input,
        topology,
        object_name,
        category,
        yearly_output: output_dir.join(format!("district_yearly_{slug}.csv")),
        mean_output: output_dir.join(format!("district_mean_{slug}.csv")),
        geojson_output: output_dir.join(format!("district_map_{slug}.geojson")),
    }
}

/// Computes the per-district statistics and `GeoJSON`.
///
/// # Errors
///
/// Returns an error if the step fails.
pub fn district_map(options: &DistrictMapOptions) -> CommandResult {
    let map = district_map::run(options)?;

    println!(
        "{} ({}), {} outliers removed:",
        map.category,
        options.category.english_name(),
        map.cleaning.removed()
    );
    for row in map.mean_rows() {
        match row.consumption_kwh {
            Some(kwh) => println!(
                "  {:<20} {kwh:>14.1} kWh/year ({} years)",
                row.district, row.years
            ),
            None => println!("  {:<20} {:>14}", row.district, "-"),
        }
    }
    println!("Wrote {}", options.geojson_output.display());
    Ok(())
}

/// Options for the locations table with output in `output_dir`.
#[must_use]
pub fn locations_options(input: PathBuf, output_dir: &Path) -> LocationsOptions {
    LocationsOptions {
        input,
        output: output_dir.join("locations.csv"),
    }
}

/// Computes per-location category means.
///
/// # Errors
///
/// Returns an error if the step fails.
pub fn locations(options: &LocationsOptions) -> CommandResult {
    let rows = locations::run(options)?;

    for (category, count) in locations::locations_per_category(&rows) {
        println!("  {:<20} {count} locations", category.english_name());
    }
    println!("Wrote {}", options.output.display());
    Ok(())
}

/// Options for the weather correlation with output in `output_dir`.
#[must_use]
pub fn weather_correlation_options(
    input: PathBuf,
    station: String,
    window: (chrono::NaiveDate, chrono::NaiveDate),
    category: ConsumptionCategory,
    output_dir: &Path,
) -> WeatherCorrelationOptions {
    WeatherCorrelationOptions {
        output: output_dir.join(format!("weather_correlation_{}.csv", slug(category))),
        input,
        station,
        start: window.0,
        end: window.1,
        category,
    }
}

/// Correlates monthly consumption with monthly weather.
///
/// # Errors
///
/// Returns an error if Frost credentials are missing or the step fails.
#[allow(clippy::future_not_send)]
pub async fn weather_correlation(options: &WeatherCorrelationOptions) -> CommandResult {
    let client = FrostClient::from_env()?;
    let result = weather_correlation::run(options, &client).await?;

    let show = |r: Option<f64>| r.map_or_else(|| "n/a".to_string(), |r| format!("{r:.3}"));
    println!(
        "{} at {}: {} months",
        options.category.english_name(),
        options.station,
        result.rows.len()
    );
    println!("  r(consumption, mean temperature) = {}", show(result.temperature));
    println!("  r(consumption, cloud cover)      = {}", show(result.cloud_cover));
    println!("Wrote {}", options.output.display());
    Ok(())
}

/// Options for the category shares with output in `output_dir`.
#[must_use]
pub fn shares_options(input: PathBuf, delimiter: u8, output_dir: &Path) -> SharesOptions {
    SharesOptions {
        input,
        delimiter,
        output: output_dir.join("category_shares.csv"),
    }
}

/// Writes the share of observations per category.
///
/// # Errors
///
/// Returns an error if the step fails.
pub fn category_shares(options: &SharesOptions) -> CommandResult {
    let shares = shares::run(options)?;

    for share in &shares {
        println!(
            "  {:<24} {:>8} {:>6.2}%",
            share.category, share.count, share.percent
        );
    }
    println!("Wrote {}", options.output.display());
    Ok(())
}
