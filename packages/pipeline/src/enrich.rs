//! District and station enrichment.
//!
//! Reference data (district polygons and, optionally, the station list)
//! is loaded once and shared read-only across every per-record
//! resolution. Enrichment is total: every input record comes out exactly
//! once, with "no district" / "no station" when its location is missing
//! or matches nothing.

use std::path::PathBuf;

use power_map_consumption::{read_enriched_records, write_enriched_records};
use power_map_consumption_models::EnrichedRecord;
use power_map_spatial::{DistrictIndex, load_topology_file, match_station};
use power_map_weather::FrostClient;
use power_map_weather_models::WeatherStation;
use serde::Serialize;

use crate::{
    PipelineError,
    progress::{ProgressCallback, as_units},
};

/// Read-only reference data for one run.
#[derive(Debug)]
pub struct ReferenceData {
    /// District polygons, indexed for containment queries.
    pub districts: DistrictIndex,
    /// Candidate weather stations. Empty disables station assignment.
    pub stations: Vec<WeatherStation>,
}

impl ReferenceData {
    /// Bundles loaded reference data.
    #[must_use]
    pub const fn new(districts: DistrictIndex, stations: Vec<WeatherStation>) -> Self {
        Self {
            districts,
            stations,
        }
    }
}

/// Counts from one enrichment pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnrichmentSummary {
    /// Records processed (and emitted).
    pub records: usize,
    /// Records without a location.
    pub missing_location: usize,
    /// Records assigned a district.
    pub with_district: usize,
    /// Located records outside every district.
    pub outside_districts: usize,
    /// Records assigned a station.
    pub with_station: usize,
}

/// Enriches a single record.
///
/// The district is always re-resolved from the record's location. The
/// station is re-resolved only when `reference` has stations; otherwise
/// any station id already on the record is kept.
#[must_use]
pub fn enrich_record(mut record: EnrichedRecord, reference: &ReferenceData) -> EnrichedRecord {
    let location = record.record.location;

    record.district = reference
        .districts
        .resolve_location(location)
        .map(|d| d.attributes.clone());

    if !reference.stations.is_empty() {
        record.station_id = match_station(location, &reference.stations).map(|m| m.station_id);
    }

    record
}

/// Enriches every record, preserving row count and order.
#[must_use]
pub fn enrich(
    records: Vec<EnrichedRecord>,
    reference: &ReferenceData,
    progress: &dyn ProgressCallback,
) -> (Vec<EnrichedRecord>, EnrichmentSummary) {
    progress.set_total(as_units(records.len()));

    let mut summary = EnrichmentSummary::default();
    let enriched: Vec<EnrichedRecord> = records
        .into_iter()
        .map(|record| {
            let record = enrich_record(record, reference);

            summary.records += 1;
            match (record.record.location, &record.district) {
                (None, _) => summary.missing_location += 1,
                (Some(_), Some(_)) => summary.with_district += 1,
                (Some(_), None) => summary.outside_districts += 1,
            }
            if record.station_id.is_some() {
                summary.with_station += 1;
            }

            progress.inc(1);
            record
        })
        .collect();

    progress.finish(format!(
        "{} of {} records assigned a district",
        summary.with_district, summary.records
    ));
    log::info!(
        "Enriched {} records: {} in a district, {} outside all districts, \
         {} without location, {} with a station",
        summary.records,
        summary.with_district,
        summary.outside_districts,
        summary.missing_location,
        summary.with_station
    );

    (enriched, summary)
}

/// Inputs and outputs of the district allocation use case.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Located records (`,`-separated CSV written by the geocode step).
    pub input: PathBuf,
    /// District topology file.
    pub topology: PathBuf,
    /// Name of the topology object holding the districts.
    pub object_name: String,
    /// Enriched CSV to write.
    pub output: PathBuf,
}

/// Loads the topology once, fetches stations once when `stations` is
/// given, enriches every record and writes the enriched CSV.
///
/// # Errors
///
/// * If the input or topology cannot be read
/// * If the topology is malformed
/// * If the station list cannot be fetched
/// * If the output cannot be written
#[allow(clippy::future_not_send)]
pub async fn run(
    options: &EnrichOptions,
    stations: Option<&FrostClient>,
    progress: &dyn ProgressCallback,
) -> Result<EnrichmentSummary, PipelineError> {
    let districts = load_topology_file(&options.topology, &options.object_name)?;
    let districts = DistrictIndex::new(districts);

    let stations = match stations {
        Some(client) => {
            client
                .sources(&client.config().station_name_filter)
                .await?
        }
        None => Vec::new(),
    };

    let reference = ReferenceData::new(districts, stations);
    let records = read_enriched_records(&options.input)?;

    let (enriched, summary) = enrich(records, &reference, progress);
    write_enriched_records(&options.output, &enriched)?;

    Ok(summary)
}
