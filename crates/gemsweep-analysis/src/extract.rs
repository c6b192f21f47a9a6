//! Directory extraction: load every result file under a directory, derive
//! metrics, filter and project each, and merge the lot.

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel as channel;
use tracing::{debug, info, warn};

use gemsweep_table::{discover_tables, read_table, Table, TableMerger, DEFAULT_MERGE_BATCH};

use crate::derived::{add_derived_metrics, DerivedConfig};
use crate::error::{AnalysisError, Result};
use crate::select::{Selector, Targets};

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub selector: Selector,
    pub targets: Targets,
    pub derived: DerivedConfig,
    /// Files loaded concurrently.
    pub max_workers: usize,
    /// Partial results buffered before each concatenation.
    pub batch_size: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            selector: Selector::new(),
            targets: Targets::All,
            derived: DerivedConfig::default(),
            max_workers: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            batch_size: DEFAULT_MERGE_BATCH,
        }
    }
}

/// What [`extract_dir`] produced.
#[derive(Debug)]
pub struct Extraction {
    pub table: Table,
    pub files: usize,
    /// Files that could not be processed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Load one file and run it through derivation, selection and projection.
pub fn extract_file(path: &Path, options: &ExtractOptions) -> Result<Table> {
    let mut table = read_table(path)?;
    add_derived_metrics(&mut table, &options.derived)?;
    let table = options.selector.apply(&table)?;
    options.targets.apply(&table)
}

/// Extract every table file under `dir`. Files are processed on up to
/// `max_workers` threads and merged in completion order; a file that fails
/// is logged and skipped.
pub fn extract_dir(dir: &Path, options: &ExtractOptions) -> Result<Extraction> {
    let files = discover_tables(dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no result files found");
    }
    let count = files.len();
    let workers = options.max_workers.clamp(1, count.max(1));
    info!(files = count, workers, "extracting");

    let (job_tx, job_rx) = channel::unbounded::<PathBuf>();
    for file in files {
        let _ = job_tx.send(file);
    }
    drop(job_tx);
    let (out_tx, out_rx) = channel::unbounded::<(PathBuf, Result<Table>)>();

    let mut merger = TableMerger::new(options.batch_size);
    let mut failed = Vec::new();
    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let out_tx = out_tx.clone();
            scope.spawn(move || {
                while let Ok(path) = job_rx.recv() {
                    let result = extract_file(&path, options);
                    if out_tx.send((path, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(out_tx);

        for (done, (path, result)) in out_rx.iter().enumerate() {
            match result {
                Ok(table) => {
                    debug!(path = %path.display(), rows = table.row_count(), "extracted");
                    merger.push(table.into());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    failed.push((path, e.to_string()));
                }
            }
            if (done + 1) % 100 == 0 {
                info!(done = done + 1, total = count, "extraction progress");
            }
        }
    });

    let table = merger.finish();
    info!(rows = table.row_count(), columns = table.column_count(), failed = failed.len(), "extraction finished");
    Ok(Extraction {
        table,
        files: count,
        failed,
    })
}

/// Like [`extract_dir`] but any failed file is an error.
pub fn extract_dir_strict(dir: &Path, options: &ExtractOptions) -> Result<Table> {
    let extraction = extract_dir(dir, options)?;
    match extraction.failed.into_iter().next() {
        Some((path, message)) => Err(AnalysisError::Extraction { path, message }),
        None => Ok(extraction.table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derived::{DEFAULT_CYCLE_COLUMN, DEFAULT_FMA_COLUMNS, EFFICIENCY_COLUMN};
    use gemsweep_table::{write_table, Column, Value};

    fn stats_table(mr: i64, cycles: &[f64]) -> Table {
        let rows = cycles.len();
        let int = |name: &str, v: i64| Column {
            name: name.into(),
            values: vec![Value::Int(v); rows],
        };
        Table::from_columns(
            rows,
            vec![
                int("mr", mr),
                int("nr", 4),
                int("simd_count", 2),
                int("simd_width", 128),
                int("run", 0),
                Column {
                    name: DEFAULT_FMA_COLUMNS[0].into(),
                    values: vec![Value::Float(1000.0); rows],
                },
                Column {
                    name: DEFAULT_CYCLE_COLUMN.into(),
                    values: cycles.iter().map(|&c| Value::Float(c)).collect(),
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn merges_all_files() {
        let dir = tempfile::tempdir().unwrap();
        write_table(&dir.path().join("stats0.gst"), &stats_table(2, &[1000.0, 2000.0])).unwrap();
        write_table(&dir.path().join("nested/stats1.csv"), &stats_table(4, &[500.0])).unwrap();

        let options = ExtractOptions {
            max_workers: 2,
            ..ExtractOptions::default()
        };
        let extraction = extract_dir(dir.path(), &options).unwrap();
        assert_eq!(extraction.files, 2);
        assert!(extraction.failed.is_empty());
        assert_eq!(extraction.table.row_count(), 3);
        let mut eff: Vec<f64> = extraction
            .table
            .column(EFFICIENCY_COLUMN)
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        eff.sort_by(f64::total_cmp);
        assert_eq!(eff, vec![0.25, 0.5, 1.0]);
    }

    #[test]
    fn select_and_project() {
        let dir = tempfile::tempdir().unwrap();
        write_table(&dir.path().join("a.json"), &stats_table(2, &[1000.0])).unwrap();
        write_table(&dir.path().join("b.json"), &stats_table(4, &[1000.0])).unwrap();

        let options = ExtractOptions {
            selector: Selector::parse(&["mr=4"]).unwrap(),
            targets: Targets::parse(&["efficiency"]),
            ..ExtractOptions::default()
        };
        let table = extract_dir_strict(dir.path(), &options).unwrap();
        assert_eq!(table.row_count(), 1);
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["mr", "nr", "simd_count", "simd_width", "run", "efficiency"]);
    }

    #[test]
    fn bad_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_table(&dir.path().join("good.gst"), &stats_table(2, &[1000.0])).unwrap();
        write_table(&dir.path().join("zero.gst"), &stats_table(2, &[0.0])).unwrap();

        let extraction = extract_dir(dir.path(), &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.table.row_count(), 1);
        assert_eq!(extraction.failed.len(), 1);
        assert!(extraction.failed[0].0.ends_with("zero.gst"));

        assert!(matches!(
            extract_dir_strict(dir.path(), &ExtractOptions::default()),
            Err(AnalysisError::Extraction { .. })
        ));
    }

    #[test]
    fn empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let extraction = extract_dir(dir.path(), &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.files, 0);
        assert!(extraction.table.is_empty());
    }
}
