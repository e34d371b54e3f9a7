//! Grouping and reduction of consumption records.
//!
//! Records are grouped by the combination of one or more [`GroupField`]s
//! and their measurements reduced with an [`AggregateOp`]. Missing
//! measurements are ignored. A record missing any of the key fields
//! (e.g. no district) belongs to no group and is skipped.

use std::collections::BTreeMap;

use power_map_consumption_models::{EnrichedRecord, YearMonth};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A record attribute that can be used as part of a grouping key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupField {
    /// District display name.
    District,
    /// Calendar year.
    Year,
    /// Calendar month (`YYYY-MM`).
    YearMonth,
    /// Month of year, 1-12.
    Month,
    /// Category label.
    Category,
    /// Street address.
    Address,
}

/// Reduction applied within each group.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AggregateOp {
    /// Sum of non-missing values. A group with only missing values sums
    /// to zero.
    Sum,
    /// Mean of non-missing values. A group with only missing values has
    /// no mean.
    Mean,
}

/// One component of a grouping key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    /// Numeric key (year, month of year).
    Int(i64),
    /// Calendar month.
    Period(YearMonth),
    /// Text key (district, category, address).
    Text(String),
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Period(p) => write!(f, "{p}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<YearMonth> for KeyValue {
    fn from(value: YearMonth) -> Self {
        Self::Period(value)
    }
}

/// Something that can be grouped and measured.
pub trait Groupable {
    /// The value of `field` for this record, or `None` if absent.
    fn key_value(&self, field: GroupField) -> Option<KeyValue>;

    /// The measurement to reduce, or `None` if missing.
    fn measurement(&self) -> Option<f64>;
}

impl Groupable for EnrichedRecord {
    fn key_value(&self, field: GroupField) -> Option<KeyValue> {
        let record = &self.record;
        match field {
            GroupField::District => self.district_name().map(KeyValue::from),
            GroupField::Year => Some(KeyValue::Int(i64::from(record.year()))),
            GroupField::YearMonth => Some(KeyValue::Period(record.year_month())),
            GroupField::Month => Some(KeyValue::Int(i64::from(record.month()))),
            GroupField::Category => Some(KeyValue::from(record.category.as_str())),
            GroupField::Address => Some(KeyValue::from(record.address.as_str())),
        }
    }

    fn measurement(&self) -> Option<f64> {
        self.record.consumption_kwh
    }
}

/// One output row: a unique key and its reduced statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// Key components, in the order of [`AggregateTable::fields`].
    pub key: Vec<KeyValue>,
    /// Reduced statistic.
    pub value: Option<f64>,
    /// Records in the group.
    pub records: usize,
    /// Non-missing values reduced.
    pub values: usize,
}

/// A grouped summary table with unique keys, ordered by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    /// Fields making up each key.
    pub fields: Vec<GroupField>,
    /// Reduction applied.
    pub op: AggregateOp,
    /// One row per distinct key present in the input.
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    /// Looks up the row for `key`.
    #[must_use]
    pub fn get(&self, key: &[KeyValue]) -> Option<&AggregateRow> {
        self.rows
            .binary_search_by(|row| row.key.as_slice().cmp(key))
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Position of `field` within each row's key.
    #[must_use]
    pub fn field_index(&self, field: GroupField) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Default)]
struct Accumulator {
    records: usize,
    values: usize,
    sum: f64,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        self.records += 1;
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.values += 1;
            self.sum += v;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&self, op: AggregateOp) -> Option<f64> {
        match op {
            AggregateOp::Sum => Some(self.sum),
            AggregateOp::Mean => (self.values > 0).then(|| self.sum / self.values as f64),
        }
    }
}

/// Groups `records` by `fields` and reduces each group's measurements
/// with `op`.
#[must_use]
pub fn aggregate<T: Groupable>(records: &[T], fields: &[GroupField], op: AggregateOp) -> AggregateTable {
    let mut groups: BTreeMap<Vec<KeyValue>, Accumulator> = BTreeMap::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(key) = fields
            .iter()
            .map(|f| record.key_value(*f))
            .collect::<Option<Vec<_>>>()
        else {
            skipped += 1;
            continue;
        };
        groups.entry(key).or_default().push(record.measurement());
    }

    if skipped > 0 {
        log::debug!("{skipped} records lacked a key field for grouping by {fields:?}");
    }

    reduce(groups, fields, op)
}

/// Reduces an existing table to a subset of its key fields, taking the
/// mean of the row statistics within each reduced group.
///
/// For example, reducing a `(district, year)` table of yearly sums to
/// `(district)` gives the mean yearly consumption per district. Rows with
/// no statistic are ignored. Fields not present in `table` are skipped.
#[must_use]
pub fn mean_over_groups(table: &AggregateTable, keep: &[GroupField]) -> AggregateTable {
    let indices: Vec<(GroupField, usize)> = keep
        .iter()
        .filter_map(|f| table.field_index(*f).map(|i| (*f, i)))
        .collect();
    let fields: Vec<GroupField> = indices.iter().map(|(f, _)| *f).collect();

    let mut groups: BTreeMap<Vec<KeyValue>, Accumulator> = BTreeMap::new();
    for row in &table.rows {
        let key = indices.iter().map(|(_, i)| row.key[*i].clone()).collect();
        groups.entry(key).or_default().push(row.value);
    }

    reduce(groups, &fields, AggregateOp::Mean)
}

fn reduce(
    groups: BTreeMap<Vec<KeyValue>, Accumulator>,
    fields: &[GroupField],
    op: AggregateOp,
) -> AggregateTable {
    let rows = groups
        .into_iter()
        .map(|(key, acc)| AggregateRow {
            value: acc.finish(op),
            records: acc.records,
            values: acc.values,
            key,
        })
        .collect();

    AggregateTable {
        fields: fields.to_vec(),
        op,
        rows,
    }
}
