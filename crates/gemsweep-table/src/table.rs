//! Rectangular and ragged columnar tables.
//!
//! A [`Table`] keeps its columns in first-seen order and every column has
//! exactly `row_count` values. A [`PartialTable`] is what one worker
//! produces: columns may be shorter than the row count when a statistic
//! only appeared late in a run, and are padded with zeros when merged.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::{Result, TableError};
use crate::value::Value;

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Columns produced by one unit of work. Columns may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialTable {
    pub rows: usize,
    pub columns: Vec<Column>,
}

impl PartialTable {
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// `rows * columns * 8`, the in-memory size estimate used for flushing.
    pub fn estimated_bytes(&self) -> u64 {
        (self.rows as u64) * (self.columns.len() as u64) * 8
    }
}

impl From<Table> for PartialTable {
    fn from(table: Table) -> Self {
        PartialTable {
            rows: table.rows,
            columns: table.columns,
        }
    }
}

/// A rectangular table with uniquely named columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    rows: usize,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.columns == other.columns
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from complete columns. Every column must hold `rows`
    /// values and names must be unique.
    pub fn from_columns(rows: usize, columns: Vec<Column>) -> Result<Self> {
        let mut table = Table {
            rows,
            ..Table::default()
        };
        for column in columns {
            table.add_column(column.name, column.values)?;
        }
        Ok(table)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.index.get(name).map(|&i| self.columns[i].values.as_slice())
    }

    /// Like [`Self::column`] but missing columns are an error.
    pub fn require(&self, name: &str) -> Result<&[Value]> {
        self.column(name).ok_or_else(|| TableError::MissingColumn {
            name: name.to_string(),
        })
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).and_then(|c| c.get(row))
    }

    /// Append a complete column. Existing columns are never replaced.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(TableError::DuplicateColumn { name });
        }
        if values.len() != self.rows {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.rows,
                actual: values.len(),
            });
        }
        self.index.insert(name.clone(), self.columns.len());
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Append one row. Columns the row does not mention get zero, and
    /// unseen names create new columns backfilled with zero.
    pub fn push_row<K, I>(&mut self, row: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let row_index = self.rows;
        for (name, value) in row {
            let name = name.into();
            let idx = self.ensure_column(&name);
            let values = &mut self.columns[idx].values;
            if values.len() > row_index {
                values[row_index] = value;
            } else {
                values.push(value);
            }
        }
        self.rows += 1;
        self.pad_to_rows();
    }

    /// Append rows from `rows` ragged columns. This is the merge step:
    /// missing cells on either side are filled with zero and new columns
    /// are added after the existing ones in the order they appear.
    pub fn append_columns(&mut self, rows: usize, columns: Vec<Column>) {
        let base = self.rows;
        for column in columns {
            let idx = self.ensure_column(&column.name);
            let values = &mut self.columns[idx].values;
            if values.len() > base {
                warn!(column = %column.name, "duplicate column in appended rows, keeping first");
                continue;
            }
            let mut incoming = column.values;
            if incoming.len() > rows {
                warn!(
                    column = %column.name,
                    values = incoming.len(),
                    rows,
                    "column longer than its table, truncating"
                );
                incoming.truncate(rows);
            }
            incoming.resize(rows, Value::zero());
            values.extend(incoming);
        }
        self.rows = base + rows;
        self.pad_to_rows();
    }

    /// Merge a worker's partial table into this one.
    pub fn absorb(&mut self, part: PartialTable) {
        self.append_columns(part.rows, part.columns);
    }

    /// Append all rows of `other`.
    pub fn append(&mut self, other: Table) {
        self.append_columns(other.rows, other.columns);
    }

    /// A new table containing `rows` in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: rows.iter().map(|&r| c.values[r].clone()).collect(),
            })
            .collect();
        Table {
            columns,
            index: self.index.clone(),
            rows: rows.len(),
        }
    }

    /// Rows for which `keep` returns true.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(usize) -> bool,
    {
        let rows: Vec<usize> = (0..self.rows).filter(|&r| keep(r)).collect();
        self.take_rows(&rows)
    }

    /// A table with only `names`, in that order.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut out = Table {
            rows: self.rows,
            ..Table::default()
        };
        for name in names {
            let name = name.as_ref();
            if out.has_column(name) {
                continue;
            }
            out.add_column(name, self.require(name)?.to_vec())?;
        }
        Ok(out)
    }

    /// Cells of one row paired with their column names.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(move |c| (c.name.as_str(), &c.values[row]))
    }

    /// `rows * columns * 8`, the in-memory size estimate used for flushing.
    pub fn estimated_bytes(&self) -> u64 {
        (self.rows as u64) * (self.columns.len() as u64) * 8
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.columns.len();
        self.columns.push(Column {
            name: name.to_string(),
            values: vec![Value::zero(); self.rows],
        });
        self.index.insert(name.to_string(), idx);
        idx
    }

    fn pad_to_rows(&mut self) {
        for column in &mut self.columns {
            column.values.resize(self.rows, Value::zero());
        }
    }
}

#[derive(Serialize)]
struct TableRef<'a> {
    rows: usize,
    columns: &'a [Column],
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        TableRef {
            rows: self.rows,
            columns: &self.columns,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = PartialTable::deserialize(deserializer)?;
        Table::from_columns(raw.rows, raw.columns).map_err(serde::de::Error::custom)
    }
}
