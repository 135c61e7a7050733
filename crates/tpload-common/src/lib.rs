//! tpload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared ambient pieces used by every tpload workspace member:
//!
//! - **Error Handling**: the [`TploadError`] type and its [`Result`] alias
//! - **Logging**: subscriber setup for console, rolling file, or both
//!
//! # Example
//!
//! ```no_run
//! use tpload_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("loader starting");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, TploadError};
