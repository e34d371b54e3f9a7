//! Geocoding pre-pass.
//!
//! Only the *unique* addresses missing from the cache are sent to the
//! geocoder, one at a time, paced by the service's rate limit. Every
//! answer (including "no match") is cached, then locations are joined
//! back onto the records by address.

use std::path::PathBuf;

use power_map_consumption::{attach_locations, read_raw_records, write_enriched_records};
use power_map_geocoder::{GeocodeCache, GeocodeError, Geocoder};
use serde::Serialize;

use crate::{
    PipelineError,
    progress::{ProgressCallback, as_units},
};

/// Counts from one pass over uncached addresses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LookupSummary {
    /// Addresses sent to the geocoder.
    pub queried: usize,
    /// Queried addresses that resolved to a location.
    pub resolved: usize,
}

/// Geocodes every address in `addresses` not yet in `cache`.
///
/// Duplicates are queried once. The cache is updated after each answer,
/// so on error it still holds everything resolved so far.
///
/// # Errors
///
/// Returns the first [`GeocodeError`] from the geocoder (e.g. rate
/// limiting or an HTTP failure); remaining addresses are not queried.
#[allow(clippy::future_not_send)]
pub async fn geocode_unique<'a, G: Geocoder + ?Sized>(
    cache: &mut GeocodeCache,
    addresses: impl IntoIterator<Item = &'a str>,
    geocoder: &G,
    progress: &dyn ProgressCallback,
) -> Result<LookupSummary, GeocodeError> {
    let missing = cache.missing(addresses);
    let delay = geocoder.rate_limit();

    log::info!(
        "Geocoding {} uncached addresses ({} already cached)",
        missing.len(),
        cache.len()
    );
    progress.set_total(as_units(missing.len()));

    let mut summary = LookupSummary::default();
    for (i, address) in missing.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let location = geocoder.geocode(address).await?.map(|g| g.location);
        if location.is_none() {
            log::debug!("No geocoding match for '{address}'");
        }

        summary.queried += 1;
        summary.resolved += usize::from(location.is_some());
        cache.insert(address.as_str(), location);
        progress.inc(1);
    }

    progress.finish(format!(
        "Resolved {}/{} addresses",
        summary.resolved, summary.queried
    ));

    Ok(summary)
}

/// Inputs and outputs of the geocoding use case.
#[derive(Debug, Clone)]
pub struct GeocodeOptions {
    /// Raw `;`-separated consumption export.
    pub input: PathBuf,
    /// Address cache (read if present, always written back).
    pub cache: PathBuf,
    /// Located CSV to write.
    pub output: PathBuf,
}

/// Outcome of the geocoding use case.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeocodeSummary {
    /// Records read.
    pub records: usize,
    /// Addresses looked up this run.
    pub lookups: LookupSummary,
    /// Records that received a location.
    pub located: usize,
}

/// Geocodes the raw export and writes the located records.
///
/// The cache is saved even when geocoding fails part-way, so a rerun
/// resumes where this one stopped.
///
/// # Errors
///
/// * If the input or cache cannot be read
/// * If the geocoder fails
/// * If the cache or output cannot be written
#[allow(clippy::future_not_send)]
pub async fn run<G: Geocoder + ?Sized>(
    options: &GeocodeOptions,
    geocoder: &G,
    progress: &dyn ProgressCallback,
) -> Result<GeocodeSummary, PipelineError> {
    let mut records = read_raw_records(&options.input)?;
    let mut cache = GeocodeCache::load(&options.cache)?;

    let lookups = geocode_unique(
        &mut cache,
        records.iter().map(|r| r.record.address.as_str()),
        geocoder,
        progress,
    )
    .await;

    cache.save(&options.cache)?;
    let lookups = lookups?;

    let located = attach_locations(&mut records, |address| cache.location(address));
    write_enriched_records(&options.output, &records)?;

    Ok(GeocodeSummary {
        records: records.len(),
        lookups,
        located,
    })
}
