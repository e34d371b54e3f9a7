//! Interactive menu for the power map toolchain.
//!
//! Lets the user pick a pipeline step with `dialoguer` and prompts for
//! its inputs, pre-filled with the standard data layout.

use std::path::PathBuf;

use chrono::NaiveDate;
use dialoguer::{Confirm, Input, Select};
use power_map_cli_utils::MultiProgress;
use power_map_consumption::{COMMA, SEMICOLON};
use power_map_consumption_models::ConsumptionCategory;
use power_map_pipeline::{
    enrich::EnrichOptions, geocode::GeocodeOptions, stations::StationOptions,
    weather_correlation::{DEFAULT_STATION, WeatherCorrelationOptions},
};
use power_map_spatial::DEFAULT_OBJECT_NAME;

use crate::commands::{
    self, ENRICHED_CSV, GEO_CACHE, LOCATED_CSV, OUTPUT_DIR, RAW_CSV, STATIONS_JSON, TOPOLOGY,
};

/// Top-level steps available in the menu.
enum Tool {
    Geocode,
    AllocateDistricts,
    AllocateStations,
    DistrictMap,
    Locations,
    WeatherCorrelation,
    CategoryShares,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::Geocode,
        Self::AllocateDistricts,
        Self::AllocateStations,
        Self::DistrictMap,
        Self::Locations,
        Self::WeatherCorrelation,
        Self::CategoryShares,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Geocode => "Geocode addresses",
            Self::AllocateDistricts => "Allocate districts",
            Self::AllocateStations => "Allocate weather stations",
            Self::DistrictMap => "District map statistics",
            Self::Locations => "Location means",
            Self::WeatherCorrelation => "Weather correlation",
            Self::CategoryShares => "Category shares",
        }
    }
}

fn ask_path(prompt: &str, default: &str) -> Result<PathBuf, dialoguer::Error> {
    Input::<String>::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()
        .map(PathBuf::from)
}

fn ask_category(default: ConsumptionCategory) -> Result<ConsumptionCategory, dialoguer::Error> {
    let labels: Vec<String> = ConsumptionCategory::ALL
        .iter()
        .map(|c| format!("{c} ({})", c.english_name()))
        .collect();
    let default = ConsumptionCategory::ALL
        .iter()
        .position(|c| *c == default)
        .unwrap_or(0);

    let idx = Select::new()
        .with_prompt("Category")
        .items(&labels)
        .default(default)
        .interact()?;

    Ok(ConsumptionCategory::ALL[idx])
}

fn ask_date(prompt: &str, default: NaiveDate) -> Result<NaiveDate, dialoguer::Error> {
    Input::<NaiveDate>::new()
        .with_prompt(prompt)
        .default(default)
        .interact_text()
}

/// Runs the interactive menu, prompting the user to select and configure
/// one pipeline step.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected step fails.
#[allow(clippy::too_many_lines, clippy::future_not_send)]
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Power Map Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Geocode => {
            let options = GeocodeOptions {
                input: ask_path("Raw export", RAW_CSV)?,
                cache: ask_path("Address cache", GEO_CACHE)?,
                output: ask_path("Located CSV", LOCATED_CSV)?,
            };
            commands::geocode(&options, multi).await?;
        }
        Tool::AllocateDistricts => {
            let options = EnrichOptions {
                input: ask_path("Located CSV", LOCATED_CSV)?,
                topology: ask_path("District topology", TOPOLOGY)?,
                object_name: DEFAULT_OBJECT_NAME.to_string(),
                output: ask_path("Enriched CSV", ENRICHED_CSV)?,
            };
            let with_stations = Confirm::new()
                .with_prompt("Also allocate the nearest weather station?")
                .default(false)
                .interact()?;
            commands::allocate_districts(&options, with_stations, multi).await?;
        }
        Tool::AllocateStations => {
            let options = StationOptions {
                cache: ask_path("Address cache", GEO_CACHE)?,
                name_filter: None,
                output: ask_path("Station allocation JSON", STATIONS_JSON)?,
            };
            commands::allocate_stations(&options).await?;
        }
        Tool::DistrictMap => {
            let input = ask_path("Enriched CSV", ENRICHED_CSV)?;
            let topology = ask_path("District topology", TOPOLOGY)?;
            let category = ask_category(ConsumptionCategory::ChargingStations)?;
            let output_dir = ask_path("Output directory", OUTPUT_DIR)?;
            let options = commands::district_map_options(
                input,
                topology,
                DEFAULT_OBJECT_NAME.to_string(),
                category,
                &output_dir,
            );
            commands::district_map(&options)?;
        }
        Tool::Locations => {
            let input = ask_path("Located CSV", LOCATED_CSV)?;
            let output_dir = ask_path("Output directory", OUTPUT_DIR)?;
            commands::locations(&commands::locations_options(input, &output_dir))?;
        }
        Tool::WeatherCorrelation => {
            let input = ask_path("Located CSV", LOCATED_CSV)?;
            let station: String = Input::new()
                .with_prompt("Frost station")
                .default(DEFAULT_STATION.to_string())
                .interact_text()?;
            let (default_start, default_end) = WeatherCorrelationOptions::default_window();
            let start = ask_date("Start date", default_start)?;
            let end = ask_date("End date", default_end)?;
            let category = ask_category(ConsumptionCategory::Lighting)?;
            let output_dir = ask_path("Output directory", OUTPUT_DIR)?;

            let options = commands::weather_correlation_options(
                input,
                station,
                (start, end.max(start)),
                category,
                &output_dir,
            );
            commands::weather_correlation(&options).await?;
        }
        Tool::CategoryShares => {
            let input = ask_path("Consumption CSV", RAW_CSV)?;
            let semicolon = Confirm::new()
                .with_prompt("Is the file ';'-separated (the raw export)?")
                .default(true)
                .interact()?;
            let delimiter = if semicolon { SEMICOLON } else { COMMA };
            let output_dir = ask_path("Output directory", OUTPUT_DIR)?;
            commands::category_shares(&commands::shares_options(input, delimiter, &output_dir))?;
        }
    }

    Ok(())
}
