//! JSON and `GeoJSON` output files.

use std::io::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::PipelineError;

/// Writes `value` as pretty-printed JSON, creating the parent directory
/// if needed.
///
/// # Errors
///
/// * If the directory or file cannot be created
/// * If `value` cannot be serialized
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    log::info!("Wrote {}", path.display());

    Ok(())
}

/// Writes a `GeoJSON` feature collection.
///
/// # Errors
///
/// * If the directory or file cannot be created
pub fn write_geojson(
    path: &Path,
    collection: &geojson::FeatureCollection,
) -> Result<(), PipelineError> {
    log::info!(
        "Writing {} features to {}",
        collection.features.len(),
        path.display()
    );
    write_json(path, collection)
}
