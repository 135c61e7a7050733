//! Loader definition files
//!
//! A loader is described in TOML: the folder it watches, the lock marker, the
//! CSV dialect, and an ordered list of loader types with their files and
//! column mappings. A handful of `TPLOAD_*` environment variables (read after
//! `.env`) override the deployment-specific paths.
//!
//! ```toml
//! id = "attributes"
//! folder = "/var/spool/tpload/in"
//! processed_dir = "/var/spool/tpload/done"
//!
//! [[types]]
//! name = "*attributes"
//! tenant_fields = ["Tenant", "ID"]
//!
//! [[types.files]]
//! name = "Attributes.csv"
//!
//! [[types.files.fields]]
//! attribute = "Tenant"
//! column = 0
//! mandatory = true
//! ```

use crate::error::{LoaderError, Result};
use crate::lock::LockPolicy;
use crate::loader::{Loader, DEFAULT_LOCK_FILENAME};
use crate::observe::LoadObserver;
use crate::reader::ReaderOptions;
use crate::record::TenantKey;
use crate::registry::TypeRegistration;
use crate::schema::{FileSchema, TypeSchema};
use crate::sink::{JsonLinesSink, LogSink};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Loader Configuration Constants
// ============================================================================

/// Default loader id
pub const DEFAULT_LOADER_ID: &str = "tpload";

/// Default directory for JSON-lines output
pub const DEFAULT_OUTPUT_DIR: &str = "./out";

/// Default watch interval in seconds
pub const DEFAULT_RUN_INTERVAL_SECS: u64 = 60;

/// Where committed groups go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// One JSON line per group in `<output_dir>/<type>.jsonl`
    #[default]
    Jsonl,
    /// Log only
    Log,
}

/// One loader type of a definition file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConfig {
    pub name: String,

    #[serde(default)]
    pub tenant_fields: TenantKey,

    #[serde(default)]
    pub sink: SinkKind,

    pub files: Vec<FileSchema>,
}

/// Loader definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_loader_id")]
    pub id: String,

    pub folder: PathBuf,

    /// Empty disables locking
    #[serde(default = "default_lock_filename")]
    pub lock_filename: String,

    #[serde(default)]
    pub lock_policy: LockPolicy,

    #[serde(default = "default_field_separator")]
    pub field_separator: String,

    /// Empty disables comment lines
    #[serde(default = "default_comment_char")]
    pub comment_char: String,

    #[serde(default)]
    pub processed_dir: Option<PathBuf>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_run_interval")]
    pub run_interval_secs: u64,

    pub types: Vec<TypeConfig>,
}

fn default_loader_id() -> String {
    DEFAULT_LOADER_ID.to_string()
}

fn default_lock_filename() -> String {
    DEFAULT_LOCK_FILENAME.to_string()
}

fn default_field_separator() -> String {
    ",".to_string()
}

fn default_comment_char() -> String {
    "#".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_run_interval() -> u64 {
    DEFAULT_RUN_INTERVAL_SECS
}

impl LoaderConfig {
    /// Load a definition file, apply environment overrides and validate
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        dotenvy::dotenv().ok();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read loader definition {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid loader definition {}", path.display()))?;

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a definition without environment overrides or validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LoaderError::config(e.to_string()))
    }

    /// Apply `TPLOAD_*` overrides
    ///
    /// - `TPLOAD_FOLDER`
    /// - `TPLOAD_LOCK_FILENAME`
    /// - `TPLOAD_PROCESSED_DIR`
    /// - `TPLOAD_OUTPUT_DIR`
    /// - `TPLOAD_RUN_INTERVAL_SECS`
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(folder) = std::env::var("TPLOAD_FOLDER") {
            self.folder = PathBuf::from(folder);
        }

        if let Ok(name) = std::env::var("TPLOAD_LOCK_FILENAME") {
            self.lock_filename = name;
        }

        if let Ok(dir) = std::env::var("TPLOAD_PROCESSED_DIR") {
            self.processed_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }

        if let Ok(dir) = std::env::var("TPLOAD_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        if let Ok(secs) = std::env::var("TPLOAD_RUN_INTERVAL_SECS") {
            self.run_interval_secs = secs.parse().map_err(|_| {
                LoaderError::config(format!("TPLOAD_RUN_INTERVAL_SECS is not a number: {}", secs))
            })?;
        }

        Ok(())
    }

    /// Check the definition for mistakes the loader cannot recover from
    pub fn validate(&self) -> Result<()> {
        if self.folder.as_os_str().is_empty() {
            return Err(LoaderError::config("folder cannot be empty"));
        }

        if self.types.is_empty() {
            return Err(LoaderError::config("at least one loader type is required"));
        }

        if self.run_interval_secs == 0 {
            return Err(LoaderError::config("run_interval_secs must be greater than 0"));
        }

        self.reader_options()?;

        let mut names = HashSet::new();
        for ty in &self.types {
            if !names.insert(ty.name.as_str()) {
                return Err(LoaderError::config(format!(
                    "loader type '{}' is defined twice",
                    ty.name
                )));
            }

            if ty.files.is_empty() {
                return Err(LoaderError::config(format!(
                    "loader type '{}' has no files",
                    ty.name
                )));
            }

            if ty.tenant_fields.attributes().is_empty() {
                return Err(LoaderError::config(format!(
                    "loader type '{}' has an empty tenant key",
                    ty.name
                )));
            }

            let mut files = HashSet::new();
            for file in &ty.files {
                if !files.insert(file.name.as_str()) {
                    return Err(LoaderError::config(format!(
                        "loader type '{}' lists file '{}' twice",
                        ty.name, file.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// CSV dialect derived from the separator and comment settings
    pub fn reader_options(&self) -> Result<ReaderOptions> {
        let delimiter = single_byte(&self.field_separator)
            .ok_or_else(|| {
                LoaderError::config(format!(
                    "field_separator must be one ASCII character, got '{}'",
                    self.field_separator
                ))
            })?;

        let comment = if self.comment_char.is_empty() {
            None
        } else {
            Some(single_byte(&self.comment_char).ok_or_else(|| {
                LoaderError::config(format!(
                    "comment_char must be one ASCII character, got '{}'",
                    self.comment_char
                ))
            })?)
        };

        Ok(ReaderOptions {
            delimiter,
            comment,
        })
    }

    /// Build a loader with one registration per configured type
    ///
    /// With `dry_run` every type commits to a [`LogSink`] regardless of its
    /// configured sink.
    pub fn build_loader(&self, observer: Arc<dyn LoadObserver>, dry_run: bool) -> Result<Loader> {
        let mut builder = Loader::builder(&self.id, &self.folder)
            .lock_filename(&self.lock_filename)
            .lock_policy(self.lock_policy)
            .reader_options(self.reader_options()?)
            .observer(observer);

        if let Some(dir) = &self.processed_dir {
            builder = builder.processed_dir(dir);
        }

        for ty in &self.types {
            let schema = TypeSchema::new(ty.files.clone());
            let key = ty.tenant_fields.clone();
            let registration = match (dry_run, ty.sink) {
                (true, _) | (false, SinkKind::Log) => {
                    TypeRegistration::from_schema(&ty.name, schema, key, LogSink)
                },
                (false, SinkKind::Jsonl) => {
                    let sink = JsonLinesSink::new(&self.output_dir)
                        .map_err(|e| LoaderError::config(format!("{:#}", e)))?;
                    TypeRegistration::from_schema(&ty.name, schema, key, sink)
                },
            };
            builder = builder.register(registration);
        }

        builder.build()
    }
}

fn single_byte(s: &str) -> Option<u8> {
    match s.as_bytes() {
        [b] if b.is_ascii() => Some(*b),
        _ => None,
    }
}
