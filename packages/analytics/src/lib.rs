#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cleaning and summary statistics for enriched consumption records.
//!
//! - [`clean`]: negative-value substitution and per-category quantile
//!   outlier filtering.
//! - [`aggregate`]: grouping by district and/or time period with sum or
//!   mean reduction.
//! - [`correlation`] and [`shares`]: the statistics behind the weather
//!   scatter plots and the category bar chart.

pub mod aggregate;
pub mod clean;
pub mod correlation;
pub mod quantile;
pub mod shares;

pub use aggregate::{
    AggregateOp, AggregateRow, AggregateTable, GroupField, Groupable, KeyValue, aggregate,
    mean_over_groups,
};
pub use clean::{
    CategoryOutcome, CategoryReport, Cleaned, CleaningReport, OutlierBounds, clean, clean_by,
    substitute_negative,
};
pub use correlation::pearson;
pub use quantile::{quantile, quantile_sorted};
pub use shares::{CategoryShare, category_shares};
