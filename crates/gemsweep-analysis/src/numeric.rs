//! Numeric column access shared by the queries.

use gemsweep_table::Table;

use crate::error::{AnalysisError, Result};

/// Every cell of `name` as `f64`. Text cells are an error.
pub(crate) fn numeric_column(table: &Table, name: &str) -> Result<Vec<f64>> {
    let values = table.column(name).ok_or_else(|| AnalysisError::MissingColumn {
        name: name.to_string(),
    })?;
    values
        .iter()
        .enumerate()
        .map(|(row, v)| {
            v.as_f64().ok_or_else(|| AnalysisError::NotNumeric {
                column: name.to_string(),
                row,
            })
        })
        .collect()
}

/// A parameter cell as an unsigned integer.
pub(crate) fn parameter(value: f64, column: &str, row: usize) -> Result<u32> {
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(AnalysisError::NotNumeric {
            column: column.to_string(),
            row,
        })
    }
}

/// Grouping key for a cell: numbers compare by value, so `2` and `2.0`
/// land in the same group.
pub(crate) fn group_key(value: &gemsweep_table::Value) -> String {
    match value.as_f64() {
        Some(f) => f.to_string(),
        None => value.to_string(),
    }
}
