//! Folder orchestration
//!
//! [`Loader::process_folder`] is one complete pass over the watched folder:
//!
//! 1. acquire the folder lock (a failure aborts the run)
//! 2. for each registered loader type, in registration order:
//!    open its files, stream row-sets through the transform into the tenant
//!    buffer, commit every group the buffer evicts, then commit the group
//!    left over at end of input
//! 3. release the lock, whatever happened to the individual types
//!
//! Row errors are skipped, open and commit errors end only their own type.

use crate::buffer::TenantBuffer;
use crate::error::{CommitError, LoaderError, Result, RowError};
use crate::lock::{FolderLock, LockPolicy};
use crate::observe::{LoadObserver, TracingObserver};
use crate::reader::{ReadOutcome, ReaderOptions, SyncReader};
use crate::record::Group;
use crate::registry::{LoaderRegistry, TypeRegistration};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info_span;
use uuid::Uuid;

/// Default lock marker file name
pub const DEFAULT_LOCK_FILENAME: &str = ".tpload.lck";

/// Lifecycle of one loader type within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeState {
    Idle,
    Opening,
    Streaming,
    Flushing,
    Done,
    Failed,
}

/// Why a loader type ended in [`TypeState::Failed`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum TypeFailure {
    /// A source file could not be opened; nothing was read
    Open(String),
    /// The sink rejected a group; processing stopped at that group
    Commit(String),
}

/// Outcome of one loader type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeReport {
    pub loader_type: String,
    pub state: TypeState,
    /// Row-sets consumed, including skipped ones
    pub rows_read: u64,
    /// Row-sets discarded on read or mapping errors
    pub rows_skipped: u64,
    /// Row-sets that produced no attributes
    pub rows_empty: u64,
    /// Records handed to the tenant buffer
    pub records: u64,
    pub groups_committed: u64,
    pub failure: Option<TypeFailure>,
}

impl TypeReport {
    fn new(loader_type: &str) -> Self {
        Self {
            loader_type: loader_type.to_string(),
            state: TypeState::Idle,
            rows_read: 0,
            rows_skipped: 0,
            rows_empty: 0,
            records: 0,
            groups_committed: 0,
            failure: None,
        }
    }

    fn fail(&mut self, failure: TypeFailure) {
        self.state = TypeState::Failed;
        self.failure = Some(failure);
    }
}

/// Outcome of one `process_folder` call
#[derive(Debug, Clone, Serialize)]
pub struct FolderReport {
    pub run_id: Uuid,
    pub folder: PathBuf,
    pub types: Vec<TypeReport>,
}

impl FolderReport {
    pub fn get(&self, loader_type: &str) -> Option<&TypeReport> {
        self.types.iter().find(|t| t.loader_type == loader_type)
    }

    /// Whether every type ran to completion
    pub fn is_clean(&self) -> bool {
        self.types.iter().all(|t| t.state == TypeState::Done)
    }

    pub fn groups_committed(&self) -> u64 {
        self.types.iter().map(|t| t.groups_committed).sum()
    }
}

/// Loads one watched folder
pub struct Loader {
    id: String,
    folder: PathBuf,
    lock: FolderLock,
    reader_options: ReaderOptions,
    processed_dir: Option<PathBuf>,
    registry: LoaderRegistry,
    observer: Arc<dyn LoadObserver>,
}

impl Loader {
    pub fn builder(id: impl Into<String>, folder: impl Into<PathBuf>) -> LoaderBuilder {
        LoaderBuilder::new(id.into(), folder.into())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn lock(&self) -> &FolderLock {
        &self.lock
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    /// Process every registered type under the folder lock
    ///
    /// Only lock failures are returned as errors; per-type problems are in the
    /// report. The marker is removed on every exit path, including panics
    /// while a type is being processed.
    pub fn process_folder(&mut self) -> Result<FolderReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "process_folder",
            loader_id = %self.id,
            run_id = %run_id,
            folder = %self.folder.display()
        );
        let _enter = span.enter();

        let guard = self.lock.acquire()?;
        self.observer.lock_acquired(self.lock.marker_path());

        let mut report = FolderReport {
            run_id,
            folder: self.folder.clone(),
            types: Vec::with_capacity(self.registry.len()),
        };

        let ctx = RunContext {
            folder: &self.folder,
            reader_options: &self.reader_options,
            processed_dir: self.processed_dir.as_deref(),
            observer: self.observer.as_ref(),
        };
        for registration in self.registry.iter_mut() {
            let type_report = ctx.process_type(registration);
            ctx.observer.type_finished(&type_report);
            report.types.push(type_report);
        }

        let released = guard.release();
        self.observer.lock_released(self.lock.marker_path());
        released?;

        Ok(report)
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("id", &self.id)
            .field("folder", &self.folder)
            .field("lock", &self.lock)
            .field("processed_dir", &self.processed_dir)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Shared, read-only state for processing the types of one run
struct RunContext<'a> {
    folder: &'a Path,
    reader_options: &'a ReaderOptions,
    processed_dir: Option<&'a Path>,
    observer: &'a dyn LoadObserver,
}

impl RunContext<'_> {
    fn process_type(&self, registration: &mut TypeRegistration) -> TypeReport {
        let loader_type = registration.loader_type.clone();
        let mut report = TypeReport::new(&loader_type);

        report.state = TypeState::Opening;
        let files = registration.files.iter().map(String::as_str);
        let mut reader = match SyncReader::open(self.folder, files, self.reader_options) {
            Ok(reader) => reader,
            Err(e) => {
                self.observer.type_skipped(&loader_type, &e);
                report.fail(TypeFailure::Open(e.to_string()));
                return report;
            },
        };
        self.observer.type_started(&loader_type, &registration.files);

        report.state = TypeState::Streaming;
        let mut buffer = TenantBuffer::new(registration.tenant_key.clone());
        loop {
            let row_set = match reader.next_row_set() {
                ReadOutcome::EndOfType => break,
                ReadOutcome::Skipped(e) => {
                    report.rows_read += 1;
                    report.rows_skipped += 1;
                    self.observer.row_skipped(&loader_type, &e);
                    continue;
                },
                ReadOutcome::Row(row_set) => row_set,
            };
            report.rows_read += 1;

            let record = match registration.transform.apply(&row_set) {
                Ok(record) => record,
                Err(source) => {
                    report.rows_skipped += 1;
                    let e = RowError::Mapping {
                        line: row_set.line,
                        source,
                    };
                    self.observer.row_skipped(&loader_type, &e);
                    continue;
                },
            };
            if record.is_empty() {
                report.rows_empty += 1;
                self.observer.empty_record(&loader_type, row_set.line);
                continue;
            }

            report.records += 1;
            if let Some(group) = buffer.absorb(record) {
                if let Err(e) = self.commit(registration, &mut report, group) {
                    report.fail(TypeFailure::Commit(e.to_string()));
                    return report;
                }
            }
        }

        report.state = TypeState::Flushing;
        if let Some(group) = buffer.drain() {
            if let Err(e) = self.commit(registration, &mut report, group) {
                report.fail(TypeFailure::Commit(e.to_string()));
                return report;
            }
        }

        // streams must be closed before the files move
        drop(reader);
        report.state = TypeState::Done;

        if let Some(dir) = self.processed_dir {
            self.move_processed(&loader_type, &registration.files, dir);
        }

        report
    }

    fn commit(
        &self,
        registration: &mut TypeRegistration,
        report: &mut TypeReport,
        group: Group,
    ) -> std::result::Result<(), CommitError> {
        let tenant_id = group.tenant_id.clone();
        let records = group.len();

        if let Err(source) = registration.sink.commit(&registration.loader_type, group) {
            let e = CommitError {
                loader_type: registration.loader_type.clone(),
                tenant_id: tenant_id.to_string(),
                source,
            };
            self.observer.commit_failed(&registration.loader_type, &e);
            return Err(e);
        }

        report.groups_committed += 1;
        self.observer
            .group_committed(&registration.loader_type, &tenant_id, records);
        Ok(())
    }

    fn move_processed(&self, loader_type: &str, files: &[String], dir: &Path) {
        if let Err(e) = std::fs::create_dir_all(dir) {
            self.observer.file_move_failed(loader_type, dir, &e);
            return;
        }
        for name in files {
            let from = self.folder.join(name);
            if let Err(e) = std::fs::rename(&from, dir.join(name)) {
                self.observer.file_move_failed(loader_type, &from, &e);
            }
        }
    }
}

/// Builder for [`Loader`]
pub struct LoaderBuilder {
    id: String,
    folder: PathBuf,
    lock_filename: String,
    lock_policy: LockPolicy,
    reader_options: ReaderOptions,
    processed_dir: Option<PathBuf>,
    registrations: Vec<TypeRegistration>,
    observer: Arc<dyn LoadObserver>,
}

impl LoaderBuilder {
    fn new(id: String, folder: PathBuf) -> Self {
        Self {
            id,
            folder,
            lock_filename: DEFAULT_LOCK_FILENAME.to_string(),
            lock_policy: LockPolicy::default(),
            reader_options: ReaderOptions::default(),
            processed_dir: None,
            registrations: Vec::new(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Lock marker file name; empty disables locking
    pub fn lock_filename(mut self, name: impl Into<String>) -> Self {
        self.lock_filename = name.into();
        self
    }

    pub fn lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    pub fn reader_options(mut self, options: ReaderOptions) -> Self {
        self.reader_options = options;
        self
    }

    /// Move the files of each completed type into `dir`
    pub fn processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.processed_dir = Some(dir.into());
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn register(mut self, registration: TypeRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    pub fn build(self) -> Result<Loader> {
        if self.folder.as_os_str().is_empty() {
            return Err(LoaderError::config("loader folder is empty"));
        }

        let mut registry = LoaderRegistry::new();
        for registration in self.registrations {
            registry.register(registration)?;
        }

        Ok(Loader {
            lock: FolderLock::new(&self.folder, &self.lock_filename, self.lock_policy),
            id: self.id,
            folder: self.folder,
            reader_options: self.reader_options,
            processed_dir: self.processed_dir,
            registry,
            observer: self.observer,
        })
    }
}
