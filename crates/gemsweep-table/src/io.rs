//! Reading and writing table files by extension, and result directory discovery.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::csv::{read_csv, write_csv};
use crate::error::{Result, TableError};
use crate::format::{GstFile, GstFlags};
use crate::table::Table;

/// On-disk table encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Binary GST container with integrity hash.
    #[default]
    Gst,
    Csv,
    Json,
}

impl TableFormat {
    pub const ALL: [TableFormat; 3] = [TableFormat::Gst, TableFormat::Csv, TableFormat::Json];

    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Gst => "gst",
            TableFormat::Csv => "csv",
            TableFormat::Json => "json",
        }
    }

    pub fn parse(name: &str) -> Option<TableFormat> {
        TableFormat::ALL.into_iter().find(|f| f.extension() == name)
    }

    pub fn from_path(path: &Path) -> Result<TableFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(TableFormat::parse)
            .ok_or_else(|| TableError::UnknownFormat {
                path: path.to_path_buf(),
            })
    }
}

/// Write `table` to `path` in the format implied by its extension.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    write_table_with_flags(path, table, GstFlags::NONE)
}

/// Like [`write_table`], with extra flags recorded in GST headers.
pub fn write_table_with_flags(path: &Path, table: &Table, extra: GstFlags) -> Result<()> {
    let format = TableFormat::from_path(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    match format {
        TableFormat::Gst => {
            let mut file = GstFile::new(table.clone());
            file.flags.set(extra.bits());
            file.write_to(&mut writer)?;
        }
        TableFormat::Csv => write_csv(table, &mut writer)?,
        TableFormat::Json => serde_json::to_writer(&mut writer, table)
            .map_err(|e| TableError::Serialization(e.to_string()))?,
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = table.row_count(), "wrote table");
    Ok(())
}

/// Read a table from `path`, choosing the decoder by extension.
pub fn read_table(path: &Path) -> Result<Table> {
    let format = TableFormat::from_path(path)?;
    let mut reader = BufReader::new(fs::File::open(path)?);
    let table = match format {
        TableFormat::Gst => GstFile::read_from(&mut reader)?.table,
        TableFormat::Csv => read_csv(&mut reader)?,
        TableFormat::Json => serde_json::from_reader(reader)
            .map_err(|e| TableError::Serialization(e.to_string()))?,
    };
    Ok(table)
}

/// Every table file under `dir`, recursively, sorted by path.
pub fn discover_tables(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if TableFormat::from_path(&path).is_ok() {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Path of the `index`-th rolling output file, e.g. `stats3.gst`.
pub fn part_path(dir: &Path, stem: &str, index: usize, format: TableFormat) -> PathBuf {
    dir.join(format!("{stem}{index}.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn table() -> Table {
        let mut t = Table::new();
        t.push_row([("mr", Value::Int(2)), ("cycles", Value::Float(10.5))]);
        t
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(TableFormat::from_path(Path::new("a/stats0.gst")).unwrap(), TableFormat::Gst);
        assert_eq!(TableFormat::from_path(Path::new("x.csv")).unwrap(), TableFormat::Csv);
        assert!(TableFormat::from_path(Path::new("x.h5")).is_err());
        assert!(TableFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn write_read_every_format() {
        let dir = tempfile::tempdir().unwrap();
        for format in TableFormat::ALL {
            let path = dir.path().join(format!("t.{}", format.extension()));
            write_table(&path, &table()).unwrap();
            assert_eq!(read_table(&path).unwrap(), table(), "{format:?}");
        }
    }

    #[test]
    fn discovery_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_table(&part_path(dir.path(), "stats", 1, TableFormat::Gst), &table()).unwrap();
        write_table(&part_path(&dir.path().join("nested"), "stats", 0, TableFormat::Csv), &table()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let found = discover_tables(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("nested/stats0.csv"));
        assert!(found[1].ends_with("stats1.gst"));
    }

    #[test]
    fn extra_flags_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.gst");
        write_table_with_flags(&path, &table(), GstFlags::new(GstFlags::EXTRACTED)).unwrap();
        let bytes = fs::read(&path).unwrap();
        let file = GstFile::from_bytes(&bytes).unwrap();
        assert!(file.flags.has(GstFlags::EXTRACTED));
    }
}
