//! Error types for table operations and table files.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by table manipulation and persistence.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("column '{name}' not found")]
    MissingColumn { name: String },

    #[error("column '{name}' already exists")]
    DuplicateColumn { name: String },

    #[error("column '{name}' has {actual} values, table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid magic bytes: expected GST\\0")]
    InvalidMagic,

    #[error("unsupported format version {major}.{minor}.{patch}")]
    UnsupportedVersion { major: u8, minor: u8, patch: u8 },

    #[error("content hash mismatch: file is corrupted")]
    HashMismatch,

    #[error("file too small to be a valid GST file")]
    FileTooSmall,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("CSV error on line {line}: {detail}")]
    Csv { line: usize, detail: String },

    #[error("cannot infer table format from '{}'", path.display())]
    UnknownFormat { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;
