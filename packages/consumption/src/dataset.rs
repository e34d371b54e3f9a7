//! CSV reading and writing for consumption datasets.
//!
//! The raw municipal export is `;`-separated with Norwegian column names
//! (`addresse`, `kategori`, `dato`, `forbruk_kwh`). Enriched outputs are
//! `,`-separated and add `latitude`, `longitude`, the district columns
//! (`BYDELSNAVN`, `BYDEL`, `Kombinert`) and `station_id`. All of those are
//! optional on read, so the same reader handles every stage's output.

use std::io::{Read, Write};
use std::path::Path;

use power_map_consumption_models::{ConsumptionRecord, Coordinate, EnrichedRecord};
use power_map_district_models::DistrictAttributes;
use serde::{Deserialize, Serialize};

use crate::{DatasetError, parse_date};

/// Delimiter of the raw municipal export.
pub const SEMICOLON: u8 = b';';

/// Delimiter of every file the pipeline writes.
pub const COMMA: u8 = b',';

/// Date layout used when writing records.
const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// One CSV row, covering both raw and enriched layouts.
#[derive(Debug, Default, Deserialize, Serialize)]
struct DatasetRow {
    #[serde(rename = "addresse")]
    address: String,
    #[serde(rename = "kategori")]
    category: String,
    #[serde(rename = "dato")]
    date: String,
    #[serde(
        rename = "forbruk_kwh",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    consumption_kwh: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
    #[serde(rename = "BYDELSNAVN", default)]
    district_name: Option<String>,
    #[serde(rename = "BYDEL", default)]
    district_code: Option<String>,
    #[serde(rename = "Kombinert", default)]
    district_combined: Option<String>,
    #[serde(default)]
    station_id: Option<String>,
}

impl DatasetRow {
    fn into_record(self, row: usize) -> Result<EnrichedRecord, DatasetError> {
        let date = parse_date(&self.date).ok_or_else(|| DatasetError::InvalidDate {
            value: self.date.clone(),
            row,
        })?;

        let district = self.district_name.filter(|n| !n.trim().is_empty()).map(|name| {
            DistrictAttributes::new(
                name,
                self.district_code.unwrap_or_default(),
                self.district_combined.unwrap_or_default(),
            )
        });

        Ok(EnrichedRecord {
            record: ConsumptionRecord {
                address: self.address.trim().to_string(),
                category: self.category.trim().to_string(),
                date,
                consumption_kwh: self.consumption_kwh.filter(|v| v.is_finite()),
                location: Coordinate::from_parts(self.latitude, self.longitude),
            },
            district,
            station_id: self.station_id.filter(|s| !s.trim().is_empty()),
        })
    }

    fn from_record(record: &EnrichedRecord) -> Self {
        let district = record.district.as_ref();
        Self {
            address: record.record.address.clone(),
            category: record.record.category.clone(),
            date: record.record.date.format(OUTPUT_DATE_FORMAT).to_string(),
            consumption_kwh: record.record.consumption_kwh,
            latitude: record.record.location.map(|c| c.latitude),
            longitude: record.record.location.map(|c| c.longitude),
            district_name: district.map(|d| d.name.clone()),
            district_code: district.map(|d| d.code.clone()),
            district_combined: district.map(|d| d.combined.clone()),
            station_id: record.station_id.clone(),
        }
    }
}

/// Reads a consumption CSV from disk.
///
/// # Errors
///
/// * If the file cannot be opened
/// * If a row has an unparseable date
pub fn read_records(path: &Path, delimiter: u8) -> Result<Vec<EnrichedRecord>, DatasetError> {
    log::info!("Reading consumption records from {}", path.display());
    let file = std::fs::File::open(path)?;
    read_records_from_reader(file, delimiter)
}

/// Reads the raw `;`-separated municipal export.
///
/// # Errors
///
/// * If the file cannot be opened
/// * If a row has an unparseable date
pub fn read_raw_records(path: &Path) -> Result<Vec<EnrichedRecord>, DatasetError> {
    read_records(path, SEMICOLON)
}

/// Reads a `,`-separated file written by an earlier pipeline stage.
///
/// Covers both the geocoded output (locations only) and the fully
/// enriched output (districts and stations).
///
/// # Errors
///
/// * If the file cannot be opened
/// * If a row has an unparseable date
pub fn read_enriched_records(path: &Path) -> Result<Vec<EnrichedRecord>, DatasetError> {
    read_records(path, COMMA)
}

/// Reads consumption records from any `Read` source.
///
/// Rows that do not deserialize at all (e.g. missing the address column)
/// are skipped with a warning. Missing or non-numeric consumption and
/// coordinate cells become `None`.
///
/// # Errors
///
/// * If the header row cannot be read
/// * If a row has an unparseable date
pub fn read_records_from_reader(
    reader: impl Read,
    delimiter: u8,
) -> Result<Vec<EnrichedRecord>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (index, result) in csv_reader.deserialize::<DatasetRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping malformed row {}: {e}", index + 1);
                skipped += 1;
                continue;
            }
        };
        records.push(row.into_record(index + 1)?);
    }

    log::info!("Read {} records ({skipped} malformed rows skipped)", records.len());

    Ok(records)
}

/// Writes enriched records to disk as a `,`-separated CSV, creating the
/// parent directory if needed.
///
/// # Errors
///
/// * If the file cannot be created or written
pub fn write_enriched_records(path: &Path, records: &[EnrichedRecord]) -> Result<(), DatasetError> {
    let file = create_file(path)?;
    write_records_to_writer(file, records)?;
    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Writes enriched records to any `Write` sink.
///
/// # Errors
///
/// * If a row cannot be serialized or written
pub fn write_records_to_writer(
    writer: impl Write,
    records: &[EnrichedRecord],
) -> Result<(), DatasetError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(COMMA)
        .from_writer(writer);

    for record in records {
        csv_writer.serialize(DatasetRow::from_record(record))?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Writes any serializable rows to disk as a `,`-separated CSV with a
/// header row.
///
/// # Errors
///
/// * If the file cannot be created or written
pub fn write_table<S: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = S>,
) -> Result<usize, DatasetError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(COMMA)
        .from_writer(create_file(path)?);

    let mut count = 0;
    for row in rows {
        csv_writer.serialize(row)?;
        count += 1;
    }
    csv_writer.flush()?;

    log::info!("Wrote {count} rows to {}", path.display());

    Ok(count)
}

fn create_file(path: &Path) -> Result<std::fs::File, DatasetError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::File::create(path)?)
}
