//! Per-district consumption statistics for the choropleth map.
//!
//! Negative readings become missing, per-category outliers are removed,
//! records outside every district are dropped, and one category's
//! readings are summed per (district, year). The mean of those yearly
//! sums per district is the choropleth fill value.

use std::path::PathBuf;

use power_map_analytics::{
    AggregateOp, AggregateTable, CleaningReport, GroupField, KeyValue, aggregate, clean,
    mean_over_groups, substitute_negative,
};
use power_map_consumption::{read_enriched_records, write_table};
use power_map_consumption_models::{ConsumptionCategory, EnrichedRecord};
use power_map_spatial::{District, load_topology_file};
use serde::Serialize;

use crate::{PipelineError, output::write_geojson};

/// Feature property holding the statistic.
pub const STATISTIC_PROPERTY: &str = "forbruk_kwh";

/// Feature property holding the category label.
pub const CATEGORY_PROPERTY: &str = "kategori";

/// Yearly total for one district.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictYearRow {
    /// District name.
    #[serde(rename = "Bydel")]
    pub district: String,
    /// Calendar year.
    pub year: i64,
    /// Sum of readings in kWh.
    #[serde(rename = "forbruk_kwh")]
    pub consumption_kwh: Option<f64>,
}

/// Mean yearly total for one district.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictMeanRow {
    /// District name.
    #[serde(rename = "Bydel")]
    pub district: String,
    /// Mean of the yearly sums in kWh.
    #[serde(rename = "forbruk_kwh")]
    pub consumption_kwh: Option<f64>,
    /// Number of years averaged.
    pub years: usize,
}

/// Per-district statistics for one category.
#[derive(Debug, Clone)]
pub struct DistrictMap {
    /// Category label the statistics cover.
    pub category: String,
    /// Outlier cleaning outcome over all categories.
    pub cleaning: CleaningReport,
    /// Sums keyed by (district, year).
    pub yearly: AggregateTable,
    /// Mean of yearly sums keyed by district.
    pub mean_yearly: AggregateTable,
}

fn key_text(key: &[KeyValue], index: usize) -> String {
    key.get(index).map(ToString::to_string).unwrap_or_default()
}

impl DistrictMap {
    /// The (district, year) table as rows.
    #[must_use]
    pub fn yearly_rows(&self) -> Vec<DistrictYearRow> {
        self.yearly
            .rows
            .iter()
            .filter_map(|row| match row.key.as_slice() {
                [district, KeyValue::Int(year)] => Some(DistrictYearRow {
                    district: district.to_string(),
                    year: *year,
                    consumption_kwh: row.value,
                }),
                _ => None,
            })
            .collect()
    }

    /// The per-district mean table as rows.
    #[must_use]
    pub fn mean_rows(&self) -> Vec<DistrictMeanRow> {
        self.mean_yearly
            .rows
            .iter()
            .map(|row| DistrictMeanRow {
                district: key_text(&row.key, 0),
                consumption_kwh: row.value,
                years: row.values,
            })
            .collect()
    }

    /// Mean yearly total for `district`, if it has any readings.
    #[must_use]
    pub fn mean_for(&self, district: &str) -> Option<f64> {
        self.mean_yearly
            .get(&[KeyValue::from(district)])
            .and_then(|row| row.value)
    }

    /// Every district as a `GeoJSON` feature with the mean yearly total
    /// attached. Districts without readings get a `null` statistic.
    #[must_use]
    pub fn to_feature_collection(&self, districts: &[District]) -> geojson::FeatureCollection {
        let features = districts
            .iter()
            .map(|district| {
                let mut extra = serde_json::Map::new();
                extra.insert(
                    STATISTIC_PROPERTY.to_string(),
                    self.mean_for(&district.attributes.name)
                        .map_or(serde_json::Value::Null, serde_json::Value::from),
                );
                extra.insert(
                    CATEGORY_PROPERTY.to_string(),
                    serde_json::Value::from(self.category.as_str()),
                );
                district.to_feature(extra)
            })
            .collect();

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Computes per-district statistics for `category`.
#[must_use]
pub fn district_statistics(
    mut records: Vec<EnrichedRecord>,
    category: ConsumptionCategory,
) -> DistrictMap {
    let negatives = substitute_negative(&mut records);
    log::info!("Treated {negatives} negative readings as missing");

    let cleaned = clean(records);
    let total = cleaned.records.len();

    let selected: Vec<EnrichedRecord> = cleaned
        .records
        .into_iter()
        .filter(|r| r.district.is_some() && category.matches(&r.record.category))
        .collect();

    log::info!(
        "{} of {total} cleaned records are {category} readings inside a district",
        selected.len()
    );

    let yearly = aggregate(
        &selected,
        &[GroupField::District, GroupField::Year],
        AggregateOp::Sum,
    );
    let mean_yearly = mean_over_groups(&yearly, &[GroupField::District]);

    DistrictMap {
        category: category.to_string(),
        cleaning: cleaned.report,
        yearly,
        mean_yearly,
    }
}

/// Inputs and outputs of the district map use case.
#[derive(Debug, Clone)]
pub struct DistrictMapOptions {
    /// Enriched CSV written by district allocation.
    pub input: PathBuf,
    /// District topology file.
    pub topology: PathBuf,
    /// Name of the topology object holding the districts.
    pub object_name: String,
    /// Category to summarize.
    pub category: ConsumptionCategory,
    /// CSV of (district, year) sums.
    pub yearly_output: PathBuf,
    /// CSV of per-district means.
    pub mean_output: PathBuf,
    /// `GeoJSON` feature collection for the choropleth.
    pub geojson_output: PathBuf,
}

/// Computes the district statistics and writes both tables and the
/// `GeoJSON` hand-off.
///
/// # Errors
///
/// * If the input or topology cannot be read
/// * If the topology is malformed
/// * If an output cannot be written
pub fn run(options: &DistrictMapOptions) -> Result<DistrictMap, PipelineError> {
    let districts = load_topology_file(&options.topology, &options.object_name)?;
    let records = read_enriched_records(&options.input)?;

    let map = district_statistics(records, options.category);

    write_table(&options.yearly_output, map.yearly_rows())?;
    write_table(&options.mean_output, map.mean_rows())?;
    write_geojson(&options.geojson_output, &map.to_feature_collection(&districts))?;

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{ReferenceData, enrich};
    use crate::progress::NullProgress;
    use crate::test_support::{oslo_districts, oslo_index, record};

    const FROGNER: Option<(f64, f64)> = Some((59.92, 10.71));
    const SAGENE: Option<(f64, f64)> = Some((59.94, 10.73));
    const OUTSIDE: Option<(f64, f64)> = Some((60.00, 10.71));

    fn enriched(records: Vec<EnrichedRecord>) -> Vec<EnrichedRecord> {
        let reference = ReferenceData::new(oslo_index(), Vec::new());
        enrich(records, &reference, &NullProgress).0
    }

    fn sample() -> Vec<EnrichedRecord> {
        enriched(vec![
            record("F1", "Ladestasjoner", (2019, 1, 1), Some(10.0), FROGNER),
            record("F1", "Ladestasjoner", (2019, 6, 1), Some(20.0), FROGNER),
            record("F2", "Ladestasjoner", (2020, 1, 1), Some(50.0), FROGNER),
            record("F2", "Ladestasjoner", (2020, 2, 1), Some(-5.0), FROGNER),
            record("S1", "Ladestasjoner", (2019, 3, 1), Some(7.0), SAGENE),
            record("S1", "Belysning", (2019, 3, 1), Some(1000.0), SAGENE),
            record("X1", "Ladestasjoner", (2019, 3, 1), Some(99.0), OUTSIDE),
            record("N1", "Ladestasjoner", (2019, 3, 1), Some(99.0), None),
        ])
    }

    #[test]
    fn sums_per_district_and_year() {
        let map = district_statistics(sample(), ConsumptionCategory::ChargingStations);

        assert_eq!(
            map.yearly_rows(),
            vec![
                DistrictYearRow {
                    district: "Frogner".to_string(),
                    year: 2019,
                    consumption_kwh: Some(30.0),
                },
                DistrictYearRow {
                    district: "Frogner".to_string(),
                    year: 2020,
                    consumption_kwh: Some(50.0),
                },
                DistrictYearRow {
                    district: "Sagene".to_string(),
                    year: 2019,
                    consumption_kwh: Some(7.0),
                },
            ]
        );
    }

    #[test]
    fn averages_yearly_sums_per_district() {
        let map = district_statistics(sample(), ConsumptionCategory::ChargingStations);

        assert_eq!(map.mean_for("Frogner"), Some(40.0));
        assert_eq!(map.mean_for("Sagene"), Some(7.0));
        assert_eq!(map.mean_for("Nowhere"), None);

        let rows = map.mean_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].district, "Frogner");
        assert_eq!(rows[0].years, 2);
    }

    #[test]
    fn other_categories_do_not_leak() {
        let map = district_statistics(sample(), ConsumptionCategory::Lighting);
        assert_eq!(map.mean_for("Sagene"), Some(1000.0));
        assert_eq!(map.mean_for("Frogner"), None);
    }

    #[test]
    fn feature_collection_covers_every_district() {
        let mut records = sample();
        records.retain(|r| r.district_name() != Some("Sagene"));
        let map = district_statistics(records, ConsumptionCategory::ChargingStations);

        let collection = map.to_feature_collection(&oslo_districts());
        assert_eq!(collection.features.len(), 2);

        let props = |i: usize| collection.features[i].properties.as_ref().unwrap();
        assert_eq!(props(0)["BYDELSNAVN"], "Frogner");
        assert_eq!(props(0)[STATISTIC_PROPERTY], 40.0);
        assert_eq!(props(0)[CATEGORY_PROPERTY], "Ladestasjoner");
        assert_eq!(props(1)["BYDELSNAVN"], "Sagene");
        assert!(props(1)[STATISTIC_PROPERTY].is_null());
    }

    #[test]
    fn writes_tables_and_geojson() {
        let dir = std::env::temp_dir().join(format!("power_map_district_map_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let topology = dir.join("districts.json");
        std::fs::write(&topology, crate::test_support::oslo_topology()).unwrap();
        let input = dir.join("enriched.csv");
        power_map_consumption::write_enriched_records(&input, &sample()).unwrap();

        let options = DistrictMapOptions {
            input,
            topology,
            object_name: "Bydeler".to_string(),
            category: ConsumptionCategory::ChargingStations,
            yearly_output: dir.join("out/yearly.csv"),
            mean_output: dir.join("out/mean.csv"),
            geojson_output: dir.join("out/map.geojson"),
        };
        let map = run(&options).unwrap();
        assert_eq!(map.mean_for("Frogner"), Some(40.0));

        let yearly = std::fs::read_to_string(&options.yearly_output).unwrap();
        assert!(yearly.starts_with("Bydel,year,forbruk_kwh\n"));
        assert!(yearly.contains("Frogner,2019,30.0"));

        let geojson: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&options.geojson_output).unwrap())
                .unwrap();
        assert_eq!(geojson["type"], "FeatureCollection");
        assert_eq!(geojson["features"].as_array().unwrap().len(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
