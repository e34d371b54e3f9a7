//! Monthly consumption against monthly weather.
//!
//! One category's cleaned readings are averaged per calendar month and
//! left-joined with the station's monthly weather summary. Months missing
//! consumption, mean temperature or cloud cover are dropped before the
//! correlations are computed.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use power_map_analytics::{
    AggregateOp, GroupField, KeyValue, aggregate, clean, pearson, substitute_negative,
};
use power_map_consumption::{read_enriched_records, write_table};
use power_map_consumption_models::{ConsumptionCategory, EnrichedRecord, YearMonth};
use power_map_weather::{FrostClient, monthly_weather};
use power_map_weather_models::{MONTHLY_ELEMENTS, MonthlyWeather};
use serde::Serialize;

use crate::PipelineError;

/// Station used when none is given (Oslo - Blindern).
pub const DEFAULT_STATION: &str = "SN18700";

/// One joined month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRow {
    /// The month.
    pub year_month: YearMonth,
    /// Month of year, 1-12.
    pub month: u32,
    /// Mean reading in kWh.
    #[serde(rename = "forbruk_kwh")]
    pub consumption_kwh: f64,
    /// Mean air temperature (degrees Celsius).
    pub mean_air_temp: f64,
    /// Mean cloud area fraction (oktas).
    pub cloud_area_fraction: f64,
}

/// Joined months and the resulting correlations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherCorrelation {
    /// Category label the rows cover.
    pub category: String,
    /// Complete months in chronological order.
    pub rows: Vec<MonthlyRow>,
    /// Months with consumption that had no complete weather.
    pub dropped_months: usize,
    /// Pearson correlation of consumption and mean temperature.
    pub temperature: Option<f64>,
    /// Pearson correlation of consumption and cloud cover.
    pub cloud_cover: Option<f64>,
}

/// Correlates `category`'s monthly mean consumption with `weather`.
#[must_use]
pub fn correlate_with_weather(
    mut records: Vec<EnrichedRecord>,
    category: ConsumptionCategory,
    weather: &[MonthlyWeather],
) -> WeatherCorrelation {
    substitute_negative(&mut records);

    let selected: Vec<EnrichedRecord> = clean(records)
        .records
        .into_iter()
        .filter(|r| category.matches(&r.record.category))
        .collect();

    let monthly = aggregate(&selected, &[GroupField::YearMonth], AggregateOp::Mean);
    let weather: BTreeMap<YearMonth, &MonthlyWeather> =
        weather.iter().map(|w| (w.year_month, w)).collect();

    let mut dropped_months = 0usize;
    let rows: Vec<MonthlyRow> = monthly
        .rows
        .iter()
        .filter_map(|row| {
            let [KeyValue::Period(year_month)] = row.key.as_slice() else {
                return None;
            };
            let consumption_kwh = row.value?;
            let joined = weather.get(year_month).and_then(|w| {
                Some(MonthlyRow {
                    year_month: *year_month,
                    month: year_month.month,
                    consumption_kwh,
                    mean_air_temp: w.mean_air_temp?,
                    cloud_area_fraction: w.cloud_area_fraction?,
                })
            });
            if joined.is_none() {
                dropped_months += 1;
            }
            joined
        })
        .collect();

    let consumption: Vec<f64> = rows.iter().map(|r| r.consumption_kwh).collect();
    let temperature: Vec<f64> = rows.iter().map(|r| r.mean_air_temp).collect();
    let cloud_cover: Vec<f64> = rows.iter().map(|r| r.cloud_area_fraction).collect();

    let correlation = WeatherCorrelation {
        category: category.to_string(),
        temperature: pearson(&consumption, &temperature),
        cloud_cover: pearson(&consumption, &cloud_cover),
        rows,
        dropped_months,
    };

    log::info!(
        "{category}: {} complete months ({dropped_months} without weather), \
         r(temperature)={:?}, r(cloud cover)={:?}",
        correlation.rows.len(),
        correlation.temperature,
        correlation.cloud_cover
    );

    correlation
}

/// Inputs and outputs of the weather correlation use case.
#[derive(Debug, Clone)]
pub struct WeatherCorrelationOptions {
    /// Located or enriched CSV.
    pub input: PathBuf,
    /// Frost station identifier.
    pub station: String,
    /// First day of the observation window.
    pub start: NaiveDate,
    /// Last day of the observation window.
    pub end: NaiveDate,
    /// Category to correlate.
    pub category: ConsumptionCategory,
    /// CSV of joined months.
    pub output: PathBuf,
}

impl WeatherCorrelationOptions {
    /// Default window, 2014-01-01 through 2022-12-31.
    #[must_use]
    pub fn default_window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or_default(),
            NaiveDate::from_ymd_opt(2022, 12, 31).unwrap_or_default(),
        )
    }
}

/// Fetches the station's monthly weather, correlates it with the
/// records and writes the joined table.
///
/// # Errors
///
/// * If the input cannot be read
/// * If the observations cannot be fetched or interpreted
/// * If the output cannot be written
#[allow(clippy::future_not_send)]
pub async fn run(
    options: &WeatherCorrelationOptions,
    client: &FrostClient,
) -> Result<WeatherCorrelation, PipelineError> {
    let records = read_enriched_records(&options.input)?;

    let response = client
        .observations(
            &[options.station.as_str()],
            MONTHLY_ELEMENTS,
            options.start,
            options.end,
        )
        .await?;
    let weather = monthly_weather(&response)?;

    let correlation = correlate_with_weather(records, options.category, &weather);
    write_table(&options.output, &correlation.rows)?;

    Ok(correlation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    fn month(year: i32, month: u32, temp: Option<f64>, cloud: Option<f64>) -> MonthlyWeather {
        MonthlyWeather {
            mean_air_temp: temp,
            cloud_area_fraction: cloud,
            ..MonthlyWeather::empty(YearMonth { year, month })
        }
    }

    #[test]
    fn joins_monthly_means_with_weather() {
        let records = vec![
            record("A", "Belysning", (2019, 1, 1), Some(100.0), None),
            record("B", "Belysning", (2019, 1, 15), Some(80.0), None),
            record("A", "Belysning", (2019, 2, 1), Some(60.0), None),
            record("A", "Belysning", (2019, 3, 1), Some(20.0), None),
            record("A", "Ladestasjoner", (2019, 1, 1), Some(5.0), None),
        ];
        let weather = vec![
            month(2019, 1, Some(-5.0), Some(7.0)),
            month(2019, 2, Some(0.0), Some(5.0)),
            month(2019, 3, Some(5.0), Some(3.0)),
        ];

        let result = correlate_with_weather(records, ConsumptionCategory::Lighting, &weather);

        assert_eq!(result.category, "Belysning");
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[0].consumption_kwh, 90.0);
        assert_eq!(result.rows[0].month, 1);
        assert_eq!(result.dropped_months, 0);

        let r_temp = result.temperature.unwrap();
        let r_cloud = result.cloud_cover.unwrap();
        assert!(r_temp < -0.9, "r_temp = {r_temp}");
        assert!(r_cloud > 0.9, "r_cloud = {r_cloud}");
    }

    #[test]
    fn drops_months_without_complete_weather() {
        let records = vec![
            record("A", "Belysning", (2019, 1, 1), Some(10.0), None),
            record("A", "Belysning", (2019, 2, 1), Some(20.0), None),
            record("A", "Belysning", (2019, 3, 1), Some(30.0), None),
            record("A", "Belysning", (2019, 4, 1), None, None),
        ];
        let weather = vec![
            month(2019, 1, Some(1.0), Some(2.0)),
            month(2019, 2, None, Some(2.0)),
            month(2019, 4, Some(1.0), Some(2.0)),
        ];

        let result = correlate_with_weather(records, ConsumptionCategory::Lighting, &weather);

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].year_month, YearMonth { year: 2019, month: 1 });
        assert_eq!(result.dropped_months, 2);
        assert_eq!(result.temperature, None);
    }

    #[test]
    fn rows_serialize_with_period_label() {
        let row = MonthlyRow {
            year_month: YearMonth { year: 2020, month: 3 },
            month: 3,
            consumption_kwh: 1.5,
            mean_air_temp: -1.0,
            cloud_area_fraction: 4.0,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["year_month"], "2020-03");
        assert_eq!(json["forbruk_kwh"], 1.5);
    }

    #[test]
    fn default_window_spans_2014_through_2022() {
        let (start, end) = WeatherCorrelationOptions::default_window();
        assert_eq!(start.to_string(), "2014-01-01");
        assert_eq!(end.to_string(), "2022-12-31");
    }
}
