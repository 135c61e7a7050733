//! Injected reporting for folder runs
//!
//! The loader never logs through a global handle; it reports what happened
//! to a [`LoadObserver`]. [`TracingObserver`] forwards everything to `tracing`
//! and is what the binary uses. Tests plug in their own observer to assert on
//! skipped rows and types without capturing process output.

use crate::error::{CommitError, OpenError, RowError};
use crate::loader::TypeReport;
use crate::record::TenantId;
use std::path::Path;
use tracing::{debug, info, warn};

/// Receives the observable events of a folder run
///
/// Every method has an empty default so observers only implement what they
/// care about.
pub trait LoadObserver: Send + Sync {
    fn lock_acquired(&self, _marker: Option<&Path>) {}

    fn lock_released(&self, _marker: Option<&Path>) {}

    fn type_started(&self, _loader_type: &str, _files: &[String]) {}

    /// A source file could not be opened; the type is skipped
    fn type_skipped(&self, _loader_type: &str, _error: &OpenError) {}

    /// A row-set was discarded
    fn row_skipped(&self, _loader_type: &str, _error: &RowError) {}

    /// A row-set produced no attributes and was dropped
    fn empty_record(&self, _loader_type: &str, _line: u64) {}

    fn group_committed(&self, _loader_type: &str, _tenant_id: &TenantId, _records: usize) {}

    /// The sink rejected a group; the rest of the type is abandoned
    fn commit_failed(&self, _loader_type: &str, _error: &CommitError) {}

    fn file_move_failed(&self, _loader_type: &str, _file: &Path, _error: &std::io::Error) {}

    fn type_finished(&self, _report: &TypeReport) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LoadObserver for NoopObserver {}

/// Observer that emits `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn lock_acquired(&self, marker: Option<&Path>) {
        match marker {
            Some(path) => debug!(marker = %path.display(), "Folder locked"),
            None => debug!("Folder locking disabled"),
        }
    }

    fn lock_released(&self, marker: Option<&Path>) {
        if let Some(path) = marker {
            debug!(marker = %path.display(), "Folder unlocked");
        }
    }

    fn type_started(&self, loader_type: &str, files: &[String]) {
        info!(loader_type = %loader_type, files = ?files, "Loading type");
    }

    fn type_skipped(&self, loader_type: &str, error: &OpenError) {
        warn!(loader_type = %loader_type, error = %error, "Cannot open files, type skipped");
    }

    fn row_skipped(&self, loader_type: &str, error: &RowError) {
        warn!(loader_type = %loader_type, line = error.line(), error = %error, "Row skipped");
    }

    fn empty_record(&self, loader_type: &str, line: u64) {
        debug!(loader_type = %loader_type, line, "Empty row-set dropped");
    }

    fn group_committed(&self, loader_type: &str, tenant_id: &TenantId, records: usize) {
        debug!(loader_type = %loader_type, tenant_id = %tenant_id, records, "Group committed");
    }

    fn commit_failed(&self, loader_type: &str, error: &CommitError) {
        warn!(loader_type = %loader_type, error = ?error, "Commit failed, type aborted");
    }

    fn file_move_failed(&self, loader_type: &str, file: &Path, error: &std::io::Error) {
        warn!(
            loader_type = %loader_type,
            file = %file.display(),
            error = %error,
            "Failed to move processed file"
        );
    }

    fn type_finished(&self, report: &TypeReport) {
        info!(
            loader_type = %report.loader_type,
            state = ?report.state,
            rows_read = report.rows_read,
            rows_skipped = report.rows_skipped,
            groups_committed = report.groups_committed,
            "Type finished"
        );
    }
}
