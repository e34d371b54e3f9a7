//! Missing-value substitution and per-category outlier filtering.
//!
//! Negative readings are sensor errors: they become missing values but
//! their rows are kept. Outliers are then removed per category using the
//! bounds `[Q1 - 1.5 * IQR, Q99 + 1.5 * IQR]` with `IQR = Q99 - Q1`,
//! where `Q1`/`Q99` are the 1st and 99th percentiles of that category's
//! non-missing values. Out-of-bound rows are dropped. Rows with a missing
//! value carry no measurement to judge and are kept.

use std::collections::BTreeMap;

use power_map_consumption_models::EnrichedRecord;
use serde::Serialize;

use crate::quantile::quantile_sorted;

/// Lower percentile used for the outlier bounds.
pub const LOWER_QUANTILE: f64 = 0.01;

/// Upper percentile used for the outlier bounds.
pub const UPPER_QUANTILE: f64 = 0.99;

/// Multiplier applied to the inter-percentile range.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Replaces negative consumption values with missing values.
///
/// Returns the number of values replaced. Row count is unchanged.
pub fn substitute_negative(records: &mut [EnrichedRecord]) -> usize {
    let mut replaced = 0;
    for record in records {
        if record.record.consumption_kwh.is_some_and(|v| v < 0.0) {
            record.record.consumption_kwh = None;
            replaced += 1;
        }
    }
    if replaced > 0 {
        log::info!("Replaced {replaced} negative consumption values with missing values");
    }
    replaced
}

/// Inclusive acceptance range for one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierBounds {
    /// 1st percentile.
    pub q_low: f64,
    /// 99th percentile.
    pub q_high: f64,
    /// Smallest accepted value.
    pub lower: f64,
    /// Largest accepted value.
    pub upper: f64,
}

impl OutlierBounds {
    /// Computes bounds from a category's non-missing values. Returns
    /// `None` if there are no finite values.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        let q_low = quantile_sorted(&sorted, LOWER_QUANTILE)?;
        let q_high = quantile_sorted(&sorted, UPPER_QUANTILE)?;
        let iqr = q_high - q_low;

        Some(Self {
            q_low,
            q_high,
            lower: IQR_MULTIPLIER.mul_add(-iqr, q_low),
            upper: IQR_MULTIPLIER.mul_add(iqr, q_high),
        })
    }

    /// Returns `true` if `value` lies within the bounds (inclusive).
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// What happened to one category during cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CategoryOutcome {
    /// Bounds were computed and applied.
    Filtered {
        /// The applied bounds.
        bounds: OutlierBounds,
        /// Rows kept.
        kept: usize,
        /// Rows dropped as outliers.
        removed: usize,
    },
    /// The category had no non-missing values; its rows passed through
    /// unfiltered.
    Empty {
        /// Rows passed through.
        passed_through: usize,
    },
}

/// Cleaning outcome for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    /// Category label.
    pub category: String,
    /// Result of filtering.
    #[serde(flatten)]
    pub outcome: CategoryOutcome,
}

/// Per-category summary of a cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    /// One entry per category, ordered by category label.
    pub categories: Vec<CategoryReport>,
}

impl CleaningReport {
    /// Total rows dropped across all categories.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.categories
            .iter()
            .map(|c| match c.outcome {
                CategoryOutcome::Filtered { removed, .. } => removed,
                CategoryOutcome::Empty { .. } => 0,
            })
            .sum()
    }

    /// Categories that had no values to compute bounds from.
    pub fn empty_categories(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .filter(|c| matches!(c.outcome, CategoryOutcome::Empty { .. }))
            .map(|c| c.category.as_str())
    }

    /// Bounds applied to `category`, if it was filtered.
    #[must_use]
    pub fn bounds(&self, category: &str) -> Option<OutlierBounds> {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .and_then(|c| match c.outcome {
                CategoryOutcome::Filtered { bounds, .. } => Some(bounds),
                CategoryOutcome::Empty { .. } => None,
            })
    }
}

/// Records kept by a cleaning pass plus its report.
#[derive(Debug, Clone)]
pub struct Cleaned<T> {
    /// Kept records, grouped by category (categories in label order,
    /// input order preserved within a category).
    pub records: Vec<T>,
    /// Per-category summary.
    pub report: CleaningReport,
}

/// Removes per-category outliers from enriched consumption records.
///
/// Apply once. Bounds are computed from the values passed in, so running
/// a second pass over already-cleaned heavy-tailed data recomputes tighter
/// bounds and can drop further rows. See [`clean_by`].
#[must_use]
pub fn clean(records: Vec<EnrichedRecord>) -> Cleaned<EnrichedRecord> {
    clean_by(
        records,
        |r| r.record.category.as_str(),
        |r| r.record.consumption_kwh,
    )
}

/// Removes per-category outliers from arbitrary records.
///
/// `category` selects the partition key and `value` the measurement.
/// Thresholds computed for one category are only ever applied to that
/// category's records.
///
/// A single pass is the contract: the result is not a fixed point. When a
/// category has a heavy tail, removing its most extreme value lowers the
/// 99th percentile, and the bounds of a repeated pass shrink accordingly.
pub fn clean_by<T, C, V>(records: Vec<T>, category: C, value: V) -> Cleaned<T>
where
    C: Fn(&T) -> &str,
    V: Fn(&T) -> Option<f64>,
{
    let mut partitions: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for record in records {
        let key = category(&record).to_string();
        partitions.entry(key).or_default().push(record);
    }

    let mut kept_records = Vec::new();
    let mut report = CleaningReport::default();

    for (label, partition) in partitions {
        let values: Vec<f64> = partition.iter().filter_map(&value).collect();

        let Some(bounds) = OutlierBounds::from_values(&values) else {
            log::warn!(
                "Category '{label}' has no non-missing values; passing {} rows through unfiltered",
                partition.len()
            );
            report.categories.push(CategoryReport {
                category: label,
                outcome: CategoryOutcome::Empty {
                    passed_through: partition.len(),
                },
            });
            kept_records.extend(partition);
            continue;
        };

        let before = partition.len();
        let start = kept_records.len();
        kept_records.extend(
            partition
                .into_iter()
                .filter(|r| value(r).is_none_or(|v| bounds.contains(v))),
        );
        let kept = kept_records.len() - start;
        let removed = before - kept;

        log::debug!(
            "Category '{label}': bounds [{:.3}, {:.3}] (Q1={:.3}, Q99={:.3})",
            bounds.lower,
            bounds.upper,
            bounds.q_low,
            bounds.q_high
        );

        report.categories.push(CategoryReport {
            category: label,
            outcome: CategoryOutcome::Filtered {
                bounds,
                kept,
                removed,
            },
        });
    }

    log::info!(
        "Outlier cleaning removed {} rows across {} categories",
        report.removed(),
        report.categories.len()
    );

    Cleaned {
        records: kept_records,
        report,
    }
}
