//! tpload Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads tenant-grouped records from a watched folder of delimited files.
//!
//! # Overview
//!
//! A folder holds, per loader type, one or more CSV files whose rows line up
//! position by position. One pass over the folder:
//!
//! - takes an advisory lock marker in the folder ([`lock`])
//! - reads each type's files in lockstep ([`reader`])
//! - maps every row-set to a flat record ([`transform`], [`schema`])
//! - groups consecutive records of one tenant ([`buffer`])
//! - commits each finished group to the type's sink ([`sink`])
//!
//! [`loader::Loader`] drives all of it; [`config`] builds one from a TOML
//! definition and [`watch`] repeats it on a timer.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tpload_ingest::{LoaderConfig, TracingObserver};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LoaderConfig::load("tpload.toml")?;
//!     let mut loader = config.build_loader(Arc::new(TracingObserver), false)?;
//!     let report = loader.process_folder()?;
//!     println!("committed {} groups", report.groups_committed());
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod loader;
pub mod lock;
pub mod observe;
pub mod reader;
pub mod record;
pub mod registry;
pub mod schema;
pub mod sink;
pub mod transform;
pub mod watch;

// Re-export commonly used types
pub use config::LoaderConfig;
pub use error::{LoaderError, Result};
pub use loader::{FolderReport, Loader, TypeReport, TypeState};
pub use observe::{LoadObserver, TracingObserver};
pub use record::{Group, Record, TenantId, TenantKey};
pub use sink::CommitSink;
