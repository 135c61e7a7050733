//! Error taxonomy for folder loading
//!
//! Each error type sits at a fixed level of a folder run:
//!
//! - [`LockError`]: the whole `process_folder` call
//! - [`OpenError`] and [`CommitError`]: one loader type
//! - [`RowError`] (and the [`MappingError`] it wraps): one row-set
//!
//! Only [`LoaderError`] leaves `process_folder`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that abort a whole folder run
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LoaderError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Lock marker could not be created or removed
#[derive(Error, Debug)]
pub enum LockError {
    #[error("folder is busy: lock marker '{}' already exists", .path.display())]
    Busy { path: PathBuf },

    #[error("cannot create lock marker '{}': {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot remove lock marker '{}': {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A source file of a loader type could not be opened
#[derive(Error, Debug)]
#[error("cannot open source file '{}': {source}", .path.display())]
pub struct OpenError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A row-set could not be turned into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("file '{file}' has {actual} columns, expected {expected}")]
    ColumnCount {
        file: String,
        expected: usize,
        actual: usize,
    },

    #[error("attribute '{attribute}': cannot read '{value}' as {kind}")]
    Coerce {
        attribute: String,
        kind: String,
        value: String,
    },

    #[error("attribute '{attribute}' is mandatory but empty")]
    MissingMandatory { attribute: String },

    #[error("row-set carries {actual} rows for a schema of {expected} files")]
    FileCount { expected: usize, actual: usize },
}

/// A single row-set was discarded
#[derive(Error, Debug)]
pub enum RowError {
    #[error("file '{file}' line {line}: {source}")]
    Read {
        file: String,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: {source}")]
    Mapping {
        line: u64,
        #[source]
        source: MappingError,
    },
}

impl RowError {
    /// Line number (1-based, counted in row-sets) of the discarded row
    pub fn line(&self) -> u64 {
        match self {
            RowError::Read { line, .. } | RowError::Mapping { line, .. } => *line,
        }
    }
}

/// The commit sink rejected a tenant group
#[derive(Error, Debug)]
#[error("commit of tenant '{tenant_id}' for type '{loader_type}' failed: {source}")]
pub struct CommitError {
    pub loader_type: String,
    pub tenant_id: String,
    #[source]
    pub source: anyhow::Error,
}
