//! Periodic folder processing

use crate::loader::Loader;
use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Counters for a finished watch loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// `process_folder` calls made
    pub runs: u64,
    /// Ticks skipped because the lock marker was present
    pub skipped: u64,
    /// Runs that ended in an error
    pub failed: u64,
}

/// Run `loader` every `interval` until `shutdown` resolves
///
/// A tick is skipped while the folder's lock marker exists, so overlapping
/// runs are never started from here. Each run executes on the blocking pool;
/// a run in progress when `shutdown` fires is allowed to finish.
///
/// A zero `interval` is rejected.
pub async fn watch<F>(mut loader: Loader, interval: Duration, shutdown: F) -> Result<WatchSummary>
where
    F: Future<Output = ()>,
{
    if interval.is_zero() {
        anyhow::bail!("watch interval must be greater than 0");
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut summary = WatchSummary::default();
    info!(
        folder = %loader.folder().display(),
        interval_secs = interval.as_secs_f64(),
        "Watching folder"
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {},
        }

        if loader.lock().is_locked() {
            summary.skipped += 1;
            debug!("Lock marker present, skipping run");
            continue;
        }

        let (returned, result) = tokio::task::spawn_blocking(move || {
            let result = loader.process_folder();
            (loader, result)
        })
        .await
        .context("Folder run panicked")?;
        loader = returned;
        summary.runs += 1;

        match result {
            Ok(report) => info!(
                run_id = %report.run_id,
                groups = report.groups_committed(),
                clean = report.is_clean(),
                "Folder run complete"
            ),
            Err(e) => {
                summary.failed += 1;
                warn!(error = %e, "Folder run failed");
            },
        }
    }

    info!(runs = summary.runs, skipped = summary.skipped, "Stopped watching folder");
    Ok(summary)
}
