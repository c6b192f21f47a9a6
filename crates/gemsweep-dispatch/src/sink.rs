//! Destinations for merged sweep results.

use std::path::{Path, PathBuf};

use tracing::info;

use gemsweep_table::{part_path, write_table, PartialTable, Table, TableFormat, TableMerger};

use crate::error::Result;

/// Receives partial tables as chunks complete.
pub trait ResultSink {
    fn accept(&mut self, part: PartialTable) -> Result<()>;

    /// Persist whatever is still buffered and list the files written.
    fn finish(&mut self) -> Result<Vec<PathBuf>>;
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    merger: TableMerger,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_table(self) -> Table {
        self.merger.finish()
    }
}

impl ResultSink for MemorySink {
    fn accept(&mut self, part: PartialTable) -> Result<()> {
        self.merger.push(part);
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

/// Writes `<stem><n>.<ext>` files, starting a new one whenever the
/// buffered rows are estimated to exceed `split_bytes`.
#[derive(Debug)]
pub struct RollingFileSink {
    dir: PathBuf,
    stem: String,
    format: TableFormat,
    split_bytes: u64,
    merger: TableMerger,
    next_index: usize,
    written: Vec<PathBuf>,
}

impl RollingFileSink {
    /// Numbering continues after any `<stem><n>` files already in `dir`.
    pub fn new(dir: &Path, stem: &str, format: TableFormat, split_bytes: u64) -> Self {
        let mut next_index = 0;
        while part_path(dir, stem, next_index, format).exists() {
            next_index += 1;
        }
        Self {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
            format,
            split_bytes,
            merger: TableMerger::default(),
            next_index,
            written: Vec::new(),
        }
    }

    fn flush(&mut self) -> Result<()> {
        let table = self.merger.take();
        if table.is_empty() {
            return Ok(());
        }
        let path = part_path(&self.dir, &self.stem, self.next_index, self.format);
        write_table(&path, &table)?;
        info!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "wrote results"
        );
        self.written.push(path);
        self.next_index += 1;
        Ok(())
    }
}

impl ResultSink for RollingFileSink {
    fn accept(&mut self, part: PartialTable) -> Result<()> {
        self.merger.push(part);
        if self.merger.estimated_bytes() > self.split_bytes {
            self.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<PathBuf>> {
        self.flush()?;
        Ok(self.written.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemsweep_table::{read_table, Column, Value};

    fn part(v: i64) -> PartialTable {
        PartialTable {
            rows: 1,
            columns: vec![
                Column {
                    name: "a".into(),
                    values: vec![Value::Int(v)],
                },
                Column {
                    name: "b".into(),
                    values: vec![Value::Int(v * 2)],
                },
            ],
        }
    }

    #[test]
    fn splits_when_estimate_exceeds_threshold() {
        let dir = tempfile::tempdir().unwrap();
        // one row of two columns is 16 bytes; split after the third row
        let mut sink = RollingFileSink::new(dir.path(), "stats", TableFormat::Json, 40);
        for v in 0..7 {
            sink.accept(part(v)).unwrap();
        }
        let files = sink.finish().unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("stats0.json"));
        assert!(files[2].ends_with("stats2.json"));

        let rows: Vec<usize> = files.iter().map(|f| read_table(f).unwrap().row_count()).collect();
        assert_eq!(rows, vec![3, 3, 1]);
        let first = read_table(&files[0]).unwrap();
        assert_eq!(first.column("b").unwrap()[2], Value::Int(4));
    }

    #[test]
    fn numbering_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stats0.gst"), b"old").unwrap();
        let mut sink = RollingFileSink::new(dir.path(), "stats", TableFormat::Gst, u64::MAX);
        sink.accept(part(1)).unwrap();
        let files = sink.finish().unwrap();
        assert_eq!(files, vec![dir.path().join("stats1.gst")]);
        assert_eq!(std::fs::read(dir.path().join("stats0.gst")).unwrap(), b"old");
    }

    #[test]
    fn empty_sink_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RollingFileSink::new(dir.path(), "stats", TableFormat::Csv, 1);
        assert!(sink.finish().unwrap().is_empty());
    }

    #[test]
    fn memory_sink_merges() {
        let mut sink = MemorySink::new();
        sink.accept(part(1)).unwrap();
        sink.accept(part(2)).unwrap();
        assert!(sink.finish().unwrap().is_empty());
        assert_eq!(sink.into_table().row_count(), 2);
    }
}
