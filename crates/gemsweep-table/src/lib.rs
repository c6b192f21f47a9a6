//! Columnar result tables for gemsweep.
//!
//! Workers produce [`PartialTable`]s of [`RunRecord`] rows; the dispatcher
//! folds them into a [`Table`] with a schema-unifying merge and persists
//! the result as `.gst`, CSV or JSON.

pub mod csv;
pub mod error;
pub mod format;
pub mod io;
pub mod merge;
pub mod record;
pub mod table;
pub mod value;

pub use error::{Result, TableError};
pub use format::{GstFile, GstFlags, GstVersion};
pub use io::{discover_tables, part_path, read_table, write_table, write_table_with_flags, TableFormat};
pub use merge::{merge, TableMerger, DEFAULT_MERGE_BATCH};
pub use record::{index_columns, RunRecord, ISA_COLUMN, RUN_COLUMN};
pub use table::{Column, PartialTable, Table};
pub use value::Value;
