//! Commit sinks: the only write path out of a folder run
//!
//! The loader hands each finished tenant group to the [`CommitSink`]
//! registered for its loader type, exactly once per group. Turning records
//! into domain objects and persisting them is the sink's business.

use crate::record::{Group, Record, TenantId};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Persists finished tenant groups
pub trait CommitSink: Send {
    /// Persist one group of `loader_type`
    ///
    /// An error stops the remaining processing of that loader type.
    fn commit(&mut self, loader_type: &str, group: Group) -> Result<()>;
}

impl<F> CommitSink for F
where
    F: FnMut(&str, Group) -> Result<()> + Send,
{
    fn commit(&mut self, loader_type: &str, group: Group) -> Result<()> {
        self(loader_type, group)
    }
}

#[derive(Serialize)]
struct GroupLine<'a> {
    #[serde(rename = "type")]
    loader_type: &'a str,
    tenant_id: &'a TenantId,
    records: &'a [Record],
}

/// Appends every committed group as one JSON line to `<dir>/<type>.jsonl`
pub struct JsonLinesSink {
    dir: PathBuf,
    writers: HashMap<String, BufWriter<File>>,
}

impl JsonLinesSink {
    /// Create the sink, making `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self {
            dir,
            writers: HashMap::new(),
        })
    }

    /// File that groups of `loader_type` are written to
    pub fn path_for(&self, loader_type: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", file_stem(loader_type)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn writer(&mut self, loader_type: &str) -> Result<&mut BufWriter<File>> {
        if !self.writers.contains_key(loader_type) {
            let path = self.path_for(loader_type);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            self.writers
                .insert(loader_type.to_string(), BufWriter::new(file));
        }
        self.writers
            .get_mut(loader_type)
            .context("writer vanished after insert")
    }
}

/// Loader type names such as `*attributes` are not friendly file names
fn file_stem(loader_type: &str) -> String {
    let stem: String = loader_type
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    stem.trim_matches('_').to_string()
}

impl CommitSink for JsonLinesSink {
    fn commit(&mut self, loader_type: &str, group: Group) -> Result<()> {
        let line = serde_json::to_string(&GroupLine {
            loader_type,
            tenant_id: &group.tenant_id,
            records: &group.records,
        })?;

        let writer = self.writer(loader_type)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Logs commits without persisting anything
#[derive(Debug, Default)]
pub struct LogSink;

impl CommitSink for LogSink {
    fn commit(&mut self, loader_type: &str, group: Group) -> Result<()> {
        info!(
            loader_type = %loader_type,
            tenant_id = %group.tenant_id,
            records = group.len(),
            "dry run: group not persisted"
        );
        Ok(())
    }
}
