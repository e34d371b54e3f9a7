//! Share of observations per category.

use std::collections::BTreeMap;

use power_map_consumption_models::EnrichedRecord;
use serde::Serialize;

/// Number and percentage of observations in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    /// Category label.
    pub category: String,
    /// Observations in the category.
    pub count: usize,
    /// Percentage of all observations (0-100).
    pub percent: f64,
}

/// Percentage of observations per category, largest first. Ties are
/// ordered by category label.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn category_shares(records: &[EnrichedRecord]) -> Vec<CategoryShare> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.record.category.as_str()).or_default() += 1;
    }

    let total = records.len() as f64;
    let mut shares: Vec<CategoryShare> = counts
        .into_iter()
        .map(|(category, count)| CategoryShare {
            category: category.to_string(),
            count,
            percent: count as f64 / total * 100.0,
        })
        .collect();

    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    shares
}
