//! Shared helpers for tpload-ingest integration tests
//!
//! - [`Fixture`]: a temporary input folder with CSV files
//! - [`RecordingSink`]: a commit sink that keeps every group it receives
//! - [`RecordingObserver`]: an observer that keeps every reported event

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tpload_ingest::error::{CommitError, OpenError, RowError};
use tpload_ingest::loader::DEFAULT_LOCK_FILENAME;
use tpload_ingest::schema::{FieldMapping, FileSchema, TypeSchema};
use tpload_ingest::{CommitSink, Group, LoadObserver, Record, TenantId, TypeReport};

/// Temporary input folder
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp folder"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str, content: impl AsRef<[u8]>) -> &Self {
        std::fs::write(self.dir.path().join(name), content).expect("Failed to write fixture");
        self
    }

    pub fn marker(&self) -> PathBuf {
        self.dir.path().join(DEFAULT_LOCK_FILENAME)
    }

    pub fn marker_exists(&self) -> bool {
        self.marker().exists()
    }
}

/// One group received by a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub loader_type: String,
    pub tenant_id: String,
    pub records: Vec<Record>,
}

impl Commit {
    /// Values of one attribute across the committed records
    pub fn values(&self, attribute: &str) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.get(attribute).unwrap_or_default().to_string())
            .collect()
    }
}

/// Sink that records commits, optionally rejecting one tenant
#[derive(Clone, Default)]
pub struct RecordingSink {
    commits: Arc<Mutex<Vec<Commit>>>,
    reject_tenant: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink sharing this one's log that fails when it sees `tenant`
    pub fn rejecting(&self, tenant: &str) -> Self {
        Self {
            commits: Arc::clone(&self.commits),
            reject_tenant: Some(tenant.to_string()),
        }
    }

    pub fn commits(&self) -> Vec<Commit> {
        self.commits.lock().unwrap().clone()
    }

    pub fn tenants(&self) -> Vec<String> {
        self.commits().into_iter().map(|c| c.tenant_id).collect()
    }
}

impl CommitSink for RecordingSink {
    fn commit(&mut self, loader_type: &str, group: Group) -> anyhow::Result<()> {
        if self.reject_tenant.as_deref() == Some(group.tenant_id.as_str()) {
            anyhow::bail!("storage rejected tenant {}", group.tenant_id);
        }
        self.commits.lock().unwrap().push(Commit {
            loader_type: loader_type.to_string(),
            tenant_id: group.tenant_id.to_string(),
            records: group.records,
        });
        Ok(())
    }
}

/// Events reported to a [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LockAcquired,
    LockReleased,
    TypeStarted(String),
    TypeSkipped(String),
    RowSkipped { loader_type: String, line: u64 },
    EmptyRecord { loader_type: String, line: u64 },
    GroupCommitted { loader_type: String, tenant_id: String },
    CommitFailed(String),
    FileMoveFailed(String),
    TypeFinished(String),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn skipped_lines(&self, loader_type: &str) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::RowSkipped { loader_type: t, line } if t == loader_type => Some(line),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl LoadObserver for RecordingObserver {
    fn lock_acquired(&self, _marker: Option<&Path>) {
        self.push(Event::LockAcquired);
    }

    fn lock_released(&self, _marker: Option<&Path>) {
        self.push(Event::LockReleased);
    }

    fn type_started(&self, loader_type: &str, _files: &[String]) {
        self.push(Event::TypeStarted(loader_type.to_string()));
    }

    fn type_skipped(&self, loader_type: &str, _error: &OpenError) {
        self.push(Event::TypeSkipped(loader_type.to_string()));
    }

    fn row_skipped(&self, loader_type: &str, error: &RowError) {
        self.push(Event::RowSkipped {
            loader_type: loader_type.to_string(),
            line: error.line(),
        });
    }

    fn empty_record(&self, loader_type: &str, line: u64) {
        self.push(Event::EmptyRecord {
            loader_type: loader_type.to_string(),
            line,
        });
    }

    fn group_committed(&self, loader_type: &str, tenant_id: &TenantId, _records: usize) {
        self.push(Event::GroupCommitted {
            loader_type: loader_type.to_string(),
            tenant_id: tenant_id.to_string(),
        });
    }

    fn commit_failed(&self, loader_type: &str, _error: &CommitError) {
        self.push(Event::CommitFailed(loader_type.to_string()));
    }

    fn file_move_failed(&self, loader_type: &str, _file: &Path, _error: &std::io::Error) {
        self.push(Event::FileMoveFailed(loader_type.to_string()));
    }

    fn type_finished(&self, report: &TypeReport) {
        self.push(Event::TypeFinished(report.loader_type.clone()));
    }
}

/// Two-file attribute schema: `Attributes.csv` (ID, Weight) and
/// `AttributeFilters.csv` (FilterIDs)
pub fn attribute_schema() -> TypeSchema {
    TypeSchema::new(vec![
        FileSchema::new("Attributes.csv")
            .field(FieldMapping::column("ID", 0).mandatory())
            .field(FieldMapping::column("Weight", 1)),
        FileSchema::new("AttributeFilters.csv").field(FieldMapping::column("FilterIDs", 0)),
    ])
}

/// Single-file schema with `ID` in column 0 and `N` in column 1
pub fn single_file_schema(file: &str) -> TypeSchema {
    TypeSchema::new(vec![FileSchema::new(file)
        .field(FieldMapping::column("ID", 0).mandatory())
        .field(FieldMapping::column("N", 1))])
}

/// [`single_file_schema`] requiring exactly two columns per row
pub fn two_column_schema(file: &str) -> TypeSchema {
    TypeSchema::new(vec![FileSchema::new(file)
        .columns(2)
        .field(FieldMapping::column("ID", 0).mandatory())
        .field(FieldMapping::column("N", 1))])
}
