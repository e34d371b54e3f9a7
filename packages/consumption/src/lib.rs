#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Consumption dataset I/O.
//!
//! Reads the municipal consumption CSV (and the enriched CSVs written by
//! later pipeline stages) into [`EnrichedRecord`]s, writes enriched
//! records back out, and attaches geocoded locations to records by
//! address.

pub mod dataset;

use chrono::NaiveDate;
use power_map_consumption_models::{Coordinate, EnrichedRecord};

pub use dataset::{
    COMMA, SEMICOLON, read_enriched_records, read_raw_records, read_records,
    read_records_from_reader, write_enriched_records, write_records_to_writer, write_table,
};

/// Errors that can occur while reading or writing datasets.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A date cell could not be parsed.
    #[error("Invalid date '{value}' on row {row}")]
    InvalidDate {
        /// The rejected cell.
        value: String,
        /// 1-based data row number.
        row: usize,
    },
}

/// Date layouts accepted in the `dato` column.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

/// Date-time layouts accepted in the `dato` column (time is discarded).
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses a reading date. Returns `None` if no supported layout matches.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            // Drop fractional seconds / timezone suffixes before matching.
            let trimmed = value.get(..19).unwrap_or(value);
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Attaches a location to every record by looking up its address.
///
/// Records whose address is unknown to `lookup` get no location; row
/// count is preserved. Returns the number of records that were located.
pub fn attach_locations<F>(records: &mut [EnrichedRecord], lookup: F) -> usize
where
    F: Fn(&str) -> Option<Coordinate>,
{
    let mut located = 0;
    for record in records.iter_mut() {
        record.record.location = lookup(&record.record.address);
        if record.record.location.is_some() {
            located += 1;
        }
    }

    log::info!(
        "Attached locations to {located}/{} records ({} without coordinates)",
        records.len(),
        records.len() - located
    );

    located
}
