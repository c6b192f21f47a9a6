//! Row selection and column projection.

use std::fmt;
use std::str::FromStr;

use gemsweep_table::{index_columns, Table, Value};

use crate::error::{AnalysisError, Result};

/// Conjunction of `column == value` criteria, written `key=value`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    criteria: Vec<(String, Value)>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` arguments.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut selector = Selector::new();
        for arg in args {
            let raw = arg.as_ref();
            let (key, value) = raw
                .split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .ok_or_else(|| AnalysisError::InvalidSelector {
                    raw: raw.to_string(),
                })?;
            selector = selector.with(key.trim(), Value::parse(value));
        }
        Ok(selector)
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.criteria.push((key.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn criteria(&self) -> &[(String, Value)] {
        &self.criteria
    }

    /// Rows matching every criterion. Numbers match across `Int`/`Float`.
    /// Selecting on a column the table lacks is an error.
    pub fn apply(&self, table: &Table) -> Result<Table> {
        if self.is_empty() {
            return Ok(table.clone());
        }
        let columns = self
            .criteria
            .iter()
            .map(|(key, value)| {
                table
                    .column(key)
                    .map(|c| (c, value))
                    .ok_or_else(|| AnalysisError::MissingColumn { name: key.clone() })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(table.filter_rows(|row| columns.iter().all(|(c, v)| c[row].matches(v))))
    }
}

impl FromStr for Selector {
    type Err = AnalysisError;

    /// Whitespace- or comma-separated `key=value` pairs.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        Selector::parse(&parts)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.criteria.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Columns to keep when extracting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Targets {
    #[default]
    All,
    /// The index columns followed by these.
    Names(Vec<String>),
}

impl Targets {
    /// An empty list or the single word `all` keeps everything.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        match args {
            [] => Targets::All,
            [only] if only.as_ref() == "all" => Targets::All,
            names => Targets::Names(names.iter().map(|n| n.as_ref().to_string()).collect()),
        }
    }

    pub fn apply(&self, table: &Table) -> Result<Table> {
        match self {
            Targets::All => Ok(table.clone()),
            Targets::Names(names) => {
                let mut keep: Vec<&str> = index_columns()
                    .into_iter()
                    .filter(|c| table.has_column(c))
                    .collect();
                for name in names {
                    if !table.has_column(name) {
                        return Err(AnalysisError::MissingColumn { name: name.clone() });
                    }
                    keep.push(name);
                }
                Ok(table.project(&keep)?)
            }
        }
    }
}

/// Column names that are measurements rather than configuration.
pub fn stat_columns(table: &Table) -> Vec<&str> {
    let index = index_columns();
    table.column_names().filter(|n| !index.contains(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemsweep_table::Column;

    fn table() -> Table {
        Table::from_columns(
            3,
            vec![
                Column {
                    name: "mr".into(),
                    values: vec![Value::Int(2), Value::Int(2), Value::Int(4)],
                },
                Column {
                    name: "simd_lat".into(),
                    values: vec![Value::Int(4), Value::Int(6), Value::Int(4)],
                },
                Column {
                    name: "efficiency".into(),
                    values: vec![Value::Float(0.5), Value::Float(0.7), Value::Float(0.9)],
                },
                Column {
                    name: "system.cpu.ipc".into(),
                    values: vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn selects_conjunction() {
        let selector = Selector::parse(&["mr=2", "simd_lat=6.0"]).unwrap();
        let picked = selector.apply(&table()).unwrap();
        assert_eq!(picked.row_count(), 1);
        assert_eq!(picked.value(0, "efficiency"), Some(&Value::Float(0.7)));
    }

    #[test]
    fn empty_selector_keeps_everything() {
        assert_eq!(Selector::new().apply(&table()).unwrap(), table());
    }

    #[test]
    fn rejects_malformed_criteria() {
        assert!(matches!(
            Selector::parse(&["mr"]),
            Err(AnalysisError::InvalidSelector { .. })
        ));
        assert!(Selector::parse(&["=2"]).is_err());
        assert!(matches!(
            Selector::parse(&["nope=1"]).unwrap().apply(&table()),
            Err(AnalysisError::MissingColumn { .. })
        ));
    }

    #[test]
    fn from_str_and_display() {
        let selector: Selector = "mr=2, simd_lat=4".parse().unwrap();
        assert_eq!(selector.criteria().len(), 2);
        assert_eq!(selector.to_string(), "mr=2 simd_lat=4");
    }

    #[test]
    fn targets_keep_index_columns() {
        let projected = Targets::parse(&["efficiency"]).apply(&table()).unwrap();
        let names: Vec<&str> = projected.column_names().collect();
        assert_eq!(names, vec!["mr", "simd_lat", "efficiency"]);

        assert_eq!(Targets::parse(&["all"]), Targets::All);
        assert_eq!(Targets::parse::<&str>(&[]), Targets::All);
        assert!(Targets::parse(&["missing"]).apply(&table()).is_err());
    }

    #[test]
    fn stat_columns_skip_parameters() {
        let t = table();
        assert_eq!(stat_columns(&t), vec!["efficiency", "system.cpu.ipc"]);
    }
}
