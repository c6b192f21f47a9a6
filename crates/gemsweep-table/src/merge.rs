//! Schema-unifying concatenation of partial tables.
//!
//! Partial tables are concatenated in the order given. The column set of
//! the result is the union of all inputs in first-seen order, and a cell
//! is zero wherever the contributing table lacked that column.

use tracing::debug;

use crate::table::{PartialTable, Table};

/// Partial tables accumulated before they are folded into the running table.
pub const DEFAULT_MERGE_BATCH: usize = 100;

/// Concatenate `parts` into one rectangular table.
pub fn merge<I>(parts: I) -> Table
where
    I: IntoIterator<Item = PartialTable>,
{
    let mut table = Table::new();
    for part in parts {
        table.absorb(part);
    }
    table
}

/// Incremental merger that folds partial tables in batches.
///
/// Each batch is merged into a fresh table first and then appended to the
/// running result, so the large running table is only widened once per
/// batch rather than once per input.
#[derive(Debug)]
pub struct TableMerger {
    merged: Table,
    pending: Vec<PartialTable>,
    batch_size: usize,
}

impl Default for TableMerger {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_BATCH)
    }
}

impl TableMerger {
    pub fn new(batch_size: usize) -> Self {
        Self {
            merged: Table::new(),
            pending: Vec::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn push(&mut self, part: PartialTable) {
        self.pending.push(part);
        if self.pending.len() >= self.batch_size {
            self.flush_pending();
        }
    }

    /// Rows held, merged or pending.
    pub fn row_count(&self) -> usize {
        self.merged.row_count() + self.pending.iter().map(|p| p.rows).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Size estimate of everything held, `rows * columns * 8` per table.
    pub fn estimated_bytes(&self) -> u64 {
        self.merged.estimated_bytes() + self.pending.iter().map(PartialTable::estimated_bytes).sum::<u64>()
    }

    /// Merge everything held so far and hand it out, leaving the merger empty.
    pub fn take(&mut self) -> Table {
        self.flush_pending();
        std::mem::take(&mut self.merged)
    }

    pub fn finish(mut self) -> Table {
        self.take()
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = merge(self.pending.drain(..));
        debug!(rows = batch.row_count(), columns = batch.column_count(), "merged batch");
        self.merged.append(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use crate::value::Value;

    fn part(rows: usize, cols: &[(&str, &[i64])]) -> PartialTable {
        PartialTable {
            rows,
            columns: cols
                .iter()
                .map(|(name, values)| Column {
                    name: name.to_string(),
                    values: values.iter().map(|&v| Value::Int(v)).collect(),
                })
                .collect(),
        }
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Int(v)).collect()
    }

    #[test]
    fn union_with_zero_backfill() {
        let t = merge(vec![
            part(2, &[("a", &[1, 2]), ("b", &[3, 4])]),
            part(1, &[("a", &[5]), ("c", &[6])]),
        ]);
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.column_names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(t.column("a").unwrap(), ints(&[1, 2, 5]).as_slice());
        assert_eq!(t.column("b").unwrap(), ints(&[3, 4, 0]).as_slice());
        assert_eq!(t.column("c").unwrap(), ints(&[0, 0, 6]).as_slice());
    }

    #[test]
    fn row_count_is_sum_of_inputs() {
        let parts = vec![
            part(3, &[("x", &[1, 2, 3])]),
            part(0, &[]),
            part(2, &[("y", &[1])]),
            part(4, &[("x", &[1, 1, 1, 1]), ("z", &[2, 2, 2, 2])]),
        ];
        let t = merge(parts);
        assert_eq!(t.row_count(), 9);
        for column in t.columns() {
            assert_eq!(column.values.len(), 9);
        }
        assert_eq!(t.column("y").unwrap(), ints(&[0, 0, 0, 1, 0, 0, 0, 0, 0]).as_slice());
    }

    #[test]
    fn batched_merge_matches_direct_merge() {
        let parts: Vec<PartialTable> = (0..25)
            .map(|i| {
                if i % 3 == 0 {
                    part(2, &[("a", &[i, i]), ("extra", &[1, 1])])
                } else {
                    part(1, &[("a", &[i]), ("b", &[i * 10])])
                }
            })
            .collect();

        let direct = merge(parts.clone());
        let mut merger = TableMerger::new(4);
        for p in parts {
            merger.push(p);
        }
        assert_eq!(merger.row_count(), direct.row_count());
        assert_eq!(merger.finish(), direct);
    }

    #[test]
    fn take_leaves_merger_empty() {
        let mut merger = TableMerger::default();
        merger.push(part(1, &[("a", &[1])]));
        assert_eq!(merger.estimated_bytes(), 8);
        let t = merger.take();
        assert_eq!(t.row_count(), 1);
        assert!(merger.is_empty());
        assert_eq!(merger.take().row_count(), 0);
    }
}
