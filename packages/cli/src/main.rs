#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the power map toolchain.
//!
//! Every pipeline step is a subcommand. Without a subcommand an
//! interactive menu asks which step to run and prompts for its inputs.
//!
//! Uses `indicatif-log-bridge` (via [`power_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod commands;
mod interactive;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use power_map_consumption::SEMICOLON;
use power_map_consumption_models::ConsumptionCategory;
use power_map_pipeline::{
    enrich::EnrichOptions, geocode::GeocodeOptions, stations::StationOptions,
    weather_correlation::DEFAULT_STATION,
};
use power_map_spatial::DEFAULT_OBJECT_NAME;

use crate::commands::{
    ENRICHED_CSV, GEO_CACHE, LOCATED_CSV, OUTPUT_DIR, RAW_CSV, STATIONS_JSON, TOPOLOGY,
};

#[derive(Parser)]
#[command(
    name = "power_map",
    about = "Oslo municipal electricity consumption mapping toolchain"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode the unique addresses of the raw export and attach locations
    Geocode {
        /// Raw `;`-separated export
        #[arg(long, default_value = RAW_CSV)]
        input: PathBuf,
        /// Address cache (reused and updated)
        #[arg(long, default_value = GEO_CACHE)]
        cache: PathBuf,
        /// Located CSV to write
        #[arg(long, default_value = LOCATED_CSV)]
        output: PathBuf,
    },
    /// Assign each record to the district containing its location
    AllocateDistricts {
        /// Located CSV
        #[arg(long, default_value = LOCATED_CSV)]
        input: PathBuf,
        /// District `TopoJSON`
        #[arg(long, default_value = TOPOLOGY)]
        topology: PathBuf,
        /// Topology object holding the districts
        #[arg(long, default_value = DEFAULT_OBJECT_NAME)]
        object_name: String,
        /// Enriched CSV to write
        #[arg(long, default_value = ENRICHED_CSV)]
        output: PathBuf,
        /// Also assign the nearest Frost weather station
        #[arg(long)]
        with_stations: bool,
    },
    /// Find the nearest Frost weather station for every cached address
    AllocateStations {
        /// Address cache written by `geocode`
        #[arg(long, default_value = GEO_CACHE)]
        cache: PathBuf,
        /// Station name filter (defaults to the configured `OSLO*`)
        #[arg(long)]
        name_filter: Option<String>,
        /// JSON to write
        #[arg(long, default_value = STATIONS_JSON)]
        output: PathBuf,
    },
    /// Per-district yearly sums and the choropleth `GeoJSON`
    DistrictMap {
        /// Enriched CSV
        #[arg(long, default_value = ENRICHED_CSV)]
        input: PathBuf,
        /// District `TopoJSON`
        #[arg(long, default_value = TOPOLOGY)]
        topology: PathBuf,
        /// Topology object holding the districts
        #[arg(long, default_value = DEFAULT_OBJECT_NAME)]
        object_name: String,
        /// Category, Norwegian or English name (e.g. "Ladestasjoner")
        #[arg(long, default_value = "Ladestasjoner")]
        category: ConsumptionCategory,
        /// Directory for the tables and `GeoJSON`
        #[arg(long, default_value = OUTPUT_DIR)]
        output_dir: PathBuf,
    },
    /// Per-location category means for the marker layer
    Locations {
        /// Located or enriched CSV
        #[arg(long, default_value = LOCATED_CSV)]
        input: PathBuf,
        /// Directory for the table
        #[arg(long, default_value = OUTPUT_DIR)]
        output_dir: PathBuf,
    },
    /// Correlate monthly consumption with Frost monthly weather
    WeatherCorrelation {
        /// Located or enriched CSV
        #[arg(long, default_value = LOCATED_CSV)]
        input: PathBuf,
        /// Frost station identifier
        #[arg(long, default_value = DEFAULT_STATION)]
        station: String,
        /// First day of the observation window
        #[arg(long, default_value = "2014-01-01")]
        start: NaiveDate,
        /// Last day of the observation window
        #[arg(long, default_value = "2022-12-31")]
        end: NaiveDate,
        /// Category, Norwegian or English name
        #[arg(long, default_value = "Belysning")]
        category: ConsumptionCategory,
        /// Directory for the table
        #[arg(long, default_value = OUTPUT_DIR)]
        output_dir: PathBuf,
    },
    /// Share of observations per category
    CategoryShares {
        /// Any consumption CSV
        #[arg(long, default_value = RAW_CSV)]
        input: PathBuf,
        /// Field delimiter of the input
        #[arg(long, default_value_t = char::from(SEMICOLON))]
        delimiter: char,
        /// Directory for the table
        #[arg(long, default_value = OUTPUT_DIR)]
        output_dir: PathBuf,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = power_map_cli_utils::init_logger();
    let cli = Cli::parse();
    log::debug!("power_map {}", env!("CARGO_PKG_VERSION"));

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Geocode {
            input,
            cache,
            output,
        } => {
            let options = GeocodeOptions {
                input,
                cache,
                output,
            };
            commands::geocode(&options, &multi).await?;
        }
        Commands::AllocateDistricts {
            input,
            topology,
            object_name,
            output,
            with_stations,
        } => {
            let options = EnrichOptions {
                input,
                topology,
                object_name,
                output,
            };
            commands::allocate_districts(&options, with_stations, &multi).await?;
        }
        Commands::AllocateStations {
            cache,
            name_filter,
            output,
        } => {
            let options = StationOptions {
                cache,
                name_filter,
                output,
            };
            commands::allocate_stations(&options).await?;
        }
        Commands::DistrictMap {
            input,
            topology,
            object_name,
            category,
            output_dir,
        } => {
            let options =
                commands::district_map_options(input, topology, object_name, category, &output_dir);
            commands::district_map(&options)?;
        }
        Commands::Locations { input, output_dir } => {
            commands::locations(&commands::locations_options(input, &output_dir))?;
        }
        Commands::WeatherCorrelation {
            input,
            station,
            start,
            end,
            category,
            output_dir,
        } => {
            if end < start {
                return Err(format!("End date {end} is before start date {start}").into());
            }
            let options = commands::weather_correlation_options(
                input,
                station,
                (start, end),
                category,
                &output_dir,
            );
            commands::weather_correlation(&options).await?;
        }
        Commands::CategoryShares {
            input,
            delimiter,
            output_dir,
        } => {
            let delimiter = u8::try_from(delimiter)
                .map_err(|_| format!("Delimiter '{delimiter}' is not a single-byte character"))?;
            commands::category_shares(&commands::shares_options(input, delimiter, &output_dir))?;
        }
    }

    Ok(())
}
