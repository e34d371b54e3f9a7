//! Per-location category means for the marker layer.

use std::collections::BTreeMap;
use std::path::PathBuf;

use power_map_analytics::{AggregateOp, GroupField, KeyValue, aggregate, substitute_negative};
use power_map_consumption::{read_enriched_records, write_table};
use power_map_consumption_models::{ConsumptionCategory, Coordinate, EnrichedRecord};
use serde::Serialize;

use crate::PipelineError;

/// Mean consumption of one category at one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRow {
    /// Street address.
    #[serde(rename = "addresse")]
    pub address: String,
    /// Category label.
    #[serde(rename = "kategori")]
    pub category: String,
    /// Address latitude.
    pub latitude: f64,
    /// Address longitude.
    pub longitude: f64,
    /// Mean reading in kWh, `None` if every reading was missing.
    #[serde(rename = "forbruk_kwh")]
    pub consumption_kwh: Option<f64>,
    /// Readings in the group.
    pub readings: usize,
}

/// Mean consumption per (address, category) for the four top
/// categories. Records without a location are dropped.
#[must_use]
pub fn location_means(mut records: Vec<EnrichedRecord>) -> Vec<LocationRow> {
    substitute_negative(&mut records);

    let mut coordinates: BTreeMap<String, Coordinate> = BTreeMap::new();
    let located: Vec<EnrichedRecord> = records
        .into_iter()
        .filter(|r| r.record.known_category().is_some())
        .filter_map(|r| {
            let location = r.record.location?;
            coordinates
                .entry(r.record.address.clone())
                .or_insert(location);
            Some(r)
        })
        .collect();

    let table = aggregate(
        &located,
        &[GroupField::Address, GroupField::Category],
        AggregateOp::Mean,
    );

    let rows: Vec<LocationRow> = table
        .rows
        .iter()
        .filter_map(|row| {
            let [KeyValue::Text(address), KeyValue::Text(category)] = row.key.as_slice() else {
                return None;
            };
            let location = coordinates.get(address)?;
            Some(LocationRow {
                address: address.clone(),
                category: category.clone(),
                latitude: location.latitude,
                longitude: location.longitude,
                consumption_kwh: row.value,
                readings: row.records,
            })
        })
        .collect();

    log::info!("{} unique locations across the top categories", rows.len());

    rows
}

/// Number of locations per category, in [`ConsumptionCategory::ALL`]
/// order (the marker legend).
#[must_use]
pub fn locations_per_category(rows: &[LocationRow]) -> Vec<(ConsumptionCategory, usize)> {
    ConsumptionCategory::ALL
        .iter()
        .map(|category| {
            let count = rows.iter().filter(|r| category.matches(&r.category)).count();
            (*category, count)
        })
        .collect()
}

/// Inputs and outputs of the locations use case.
#[derive(Debug, Clone)]
pub struct LocationsOptions {
    /// Located or enriched CSV.
    pub input: PathBuf,
    /// CSV of per-location means.
    pub output: PathBuf,
}

/// Computes per-location means and writes them as CSV.
///
/// # Errors
///
/// * If the input cannot be read
/// * If the output cannot be written
pub fn run(options: &LocationsOptions) -> Result<Vec<LocationRow>, PipelineError> {
    let records = read_enriched_records(&options.input)?;
    let rows = location_means(records);
    write_table(&options.output, &rows)?;
    Ok(rows)
}
