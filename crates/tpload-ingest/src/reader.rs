//! Lockstep reading of the source files of one loader type

use crate::error::{OpenError, RowError};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// CSV dialect shared by every file of a loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderOptions {
    /// Field separator byte
    pub delimiter: u8,
    /// Lines starting with this byte are skipped
    pub comment: Option<u8>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            comment: Some(b'#'),
        }
    }
}

/// One row from every source file, taken at the same position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    /// 1-based row-set counter
    pub line: u64,
    /// One row per file, in file order
    pub rows: Vec<StringRecord>,
}

/// Result of advancing a [`SyncReader`] by one position
#[derive(Debug)]
pub enum ReadOutcome {
    /// Every stream produced a row
    Row(RowSet),
    /// At least one stream failed to read this position; the row-set is
    /// discarded but every stream still advanced
    Skipped(RowError),
    /// A stream ran out of rows; the type is finished
    EndOfType,
}

struct SourceStream {
    name: String,
    reader: csv::Reader<File>,
}

/// Owns one open stream per source file and reads them in lockstep
///
/// Dropping the reader closes every stream.
pub struct SyncReader {
    streams: Vec<SourceStream>,
    line: u64,
    exhausted: bool,
}

impl SyncReader {
    /// Open every file of a type inside `folder`
    ///
    /// The first file that cannot be opened aborts the whole open; streams
    /// opened before it are closed again.
    pub fn open<'a, I>(folder: &Path, files: I, options: &ReaderOptions) -> Result<Self, OpenError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut streams = Vec::new();
        for name in files {
            let path = folder.join(name);
            let file = File::open(&path).map_err(|source| OpenError {
                path: path.clone(),
                source,
            })?;
            let reader = ReaderBuilder::new()
                .has_headers(false)
                .delimiter(options.delimiter)
                .comment(options.comment)
                // row width is checked against the file schema, not the first row
                .flexible(true)
                .from_reader(file);
            streams.push(SourceStream {
                name: name.to_string(),
                reader,
            });
        }

        Ok(Self {
            streams,
            line: 0,
            exhausted: false,
        })
    }

    /// Number of row-sets consumed so far
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.streams.iter().map(|s| s.name.as_str())
    }

    /// Advance every stream by exactly one row
    ///
    /// End of data on any stream ends the type and the rows already taken
    /// from the other streams at that position are dropped. An I/O failure
    /// is reported once as a skipped row and then ends the type, since the
    /// stream cannot be trusted to make progress afterwards.
    pub fn next_row_set(&mut self) -> ReadOutcome {
        if self.exhausted || self.streams.is_empty() {
            self.exhausted = true;
            return ReadOutcome::EndOfType;
        }

        self.line += 1;
        let mut rows = Vec::with_capacity(self.streams.len());
        let mut failure: Option<RowError> = None;

        for stream in &mut self.streams {
            let mut row = StringRecord::new();
            match stream.reader.read_record(&mut row) {
                Ok(true) => rows.push(row),
                Ok(false) => {
                    self.exhausted = true;
                    return ReadOutcome::EndOfType;
                },
                Err(source) => {
                    if matches!(source.kind(), csv::ErrorKind::Io(_)) {
                        self.exhausted = true;
                    }
                    if failure.is_none() {
                        failure = Some(RowError::Read {
                            file: stream.name.clone(),
                            line: self.line,
                            source,
                        });
                    }
                },
            }
        }

        match failure {
            Some(err) => ReadOutcome::Skipped(err),
            None => ReadOutcome::Row(RowSet {
                line: self.line,
                rows,
            }),
        }
    }
}

impl std::fmt::Debug for SyncReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncReader")
            .field("files", &self.file_names().collect::<Vec<_>>())
            .field("line", &self.line)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
