//! Column aggregations over a table scan.
//!
//! A small analysis surface next to the quality engine: evaluate a batch
//! of per-column operations in one streaming pass and return typed
//! per-column stats with explicit optional fields.

#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::{as_f64, is_numeric, text_iter, TableScan},
    error::{Error, Result},
};

/// One aggregation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "column", rename_all = "snake_case")]
pub enum AggregateOp {
    /// Total row count; not tied to a column.
    RowCount,
    /// Sum of a numeric column.
    Sum(String),
    /// Mean of a numeric column.
    Mean(String),
    /// Minimum of a numeric column.
    Min(String),
    /// Maximum of a numeric column.
    Max(String),
    /// Number of distinct values (any column type).
    DistinctCount(String),
}

impl AggregateOp {
    /// Returns the column this operation targets, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::RowCount => None,
            Self::Sum(c) | Self::Mean(c) | Self::Min(c) | Self::Max(c)
            | Self::DistinctCount(c) => Some(c),
        }
    }

    fn needs_numeric(&self) -> bool {
        matches!(self, Self::Sum(_) | Self::Mean(_) | Self::Min(_) | Self::Max(_))
    }
}

/// Aggregation results for one column. Every field is present only when
/// the matching operation was requested and produced a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Sum of non-null values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    /// Mean of non-null values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// Minimum non-null value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum non-null value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Distinct value count (nulls count once).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_count: Option<u64>,
}

/// Results of one [`run_operations`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Total rows, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Per-column stats.
    pub columns: BTreeMap<String, ColumnStats>,
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
    distinct: HashSet<u64>,
    has_null: bool,
    want_numeric: bool,
    want_distinct: bool,
}

/// Evaluates a batch of aggregations in one streaming pass.
///
/// # Errors
///
/// Returns `ColumnNotFound` for an unknown column and `InvalidOperation`
/// when a numeric aggregation targets a non-numeric column.
pub fn run_operations(scan: &TableScan, ops: &[AggregateOp]) -> Result<AnalysisResult> {
    let schema = scan.schema();
    let mut accs: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut result = AnalysisResult::default();

    for op in ops {
        if matches!(op, AggregateOp::RowCount) {
            result.row_count = Some(scan.row_count() as u64);
            continue;
        }
        let Some(column) = op.column() else { continue };
        let index = scan.column_index(column)?;
        let data_type = schema.field(index).data_type();
        if op.needs_numeric() && !is_numeric(data_type) {
            return Err(Error::invalid_operation(format!(
                "aggregation {op:?} needs a numeric column, '{column}' is {data_type}"
            )));
        }
        let acc = accs.entry(column.to_string()).or_insert_with(|| Accumulator {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            ..Accumulator::default()
        });
        acc.want_numeric |= op.needs_numeric();
        acc.want_distinct |= matches!(op, AggregateOp::DistinctCount(_));
    }

    if !accs.is_empty() {
        let names: Vec<&str> = accs.keys().map(String::as_str).collect();
        let stream = scan.stream(&names)?;
        for batch in stream {
            let batch = batch?;
            for (name, acc) in &mut accs {
                let Some(array) = batch.column_by_name(name) else {
                    continue;
                };
                if array.null_count() > 0 {
                    acc.has_null = true;
                }
                if acc.want_numeric {
                    let floats = as_f64(array)?;
                    for value in floats.iter().flatten() {
                        acc.sum += value;
                        acc.count += 1;
                        acc.min = acc.min.min(value);
                        acc.max = acc.max.max(value);
                    }
                }
                if acc.want_distinct {
                    let as_text =
                        arrow::compute::cast(array.as_ref(), &DataType::Utf8)?;
                    let values = text_iter(&as_text);
                    if let Some(values) = values {
                        for value in values.flatten() {
                            acc.distinct.insert(hash_value(value));
                        }
                    }
                }
            }
        }
    }

    for op in ops {
        let Some(column) = op.column() else { continue };
        let Some(acc) = accs.get(column) else { continue };
        let stats = result.columns.entry(column.to_string()).or_default();
        match op {
            AggregateOp::Sum(_) => stats.sum = Some(acc.sum),
            AggregateOp::Mean(_) => {
                stats.mean = (acc.count > 0).then(|| acc.sum / acc.count as f64);
            }
            AggregateOp::Min(_) => stats.min = (acc.count > 0).then_some(acc.min),
            AggregateOp::Max(_) => stats.max = (acc.count > 0).then_some(acc.max),
            AggregateOp::DistinctCount(_) => {
                stats.distinct_count =
                    Some(acc.distinct.len() as u64 + u64::from(acc.has_null));
            }
            AggregateOp::RowCount => {}
        }
    }

    Ok(result)
}

fn hash_value(value: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
