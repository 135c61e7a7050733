//! Column-to-attribute schemas
//!
//! A [`TypeSchema`] holds one [`FileSchema`] per source file of a loader type,
//! in the order the files are read. Each file schema lists the mappings that
//! copy a column (or a constant) into a record attribute.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Naive timestamp layout accepted next to RFC 3339
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Declared kind of a mapped value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    String,
    Integer,
    Float,
    Bool,
    Timestamp,
}

impl ValueKind {
    /// Check a raw value against this kind and return its stored form
    ///
    /// Integers, floats and strings are kept as written. Booleans are
    /// normalised to `true`/`false`, timestamps to RFC 3339 UTC.
    pub fn coerce(self, raw: &str) -> Option<String> {
        match self {
            ValueKind::String => Some(raw.to_string()),
            ValueKind::Integer => raw.parse::<i64>().ok().map(|_| raw.to_string()),
            ValueKind::Float => raw.parse::<f64>().ok().map(|_| raw.to_string()),
            ValueKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Some("true".to_string()),
                "false" | "0" => Some("false".to_string()),
                _ => None,
            },
            ValueKind::Timestamp => parse_timestamp(raw)
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, NAIVE_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Where a mapped value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// Zero-based column index in the file's row
    Column(usize),
    /// Fixed value, independent of the row
    Constant(String),
}

/// One column (or constant) to attribute mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldMapping", into = "RawFieldMapping")]
pub struct FieldMapping {
    pub attribute: String,
    pub source: FieldSource,
    pub kind: ValueKind,
    pub mandatory: bool,
}

impl FieldMapping {
    pub fn column(attribute: impl Into<String>, column: usize) -> Self {
        Self {
            attribute: attribute.into(),
            source: FieldSource::Column(column),
            kind: ValueKind::String,
            mandatory: false,
        }
    }

    pub fn constant(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            source: FieldSource::Constant(value.into()),
            kind: ValueKind::String,
            mandatory: false,
        }
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

/// On-disk shape of a mapping: exactly one of `column` / `constant`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFieldMapping {
    attribute: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constant: Option<String>,
    #[serde(default)]
    kind: ValueKind,
    #[serde(default)]
    mandatory: bool,
}

impl TryFrom<RawFieldMapping> for FieldMapping {
    type Error = String;

    fn try_from(raw: RawFieldMapping) -> Result<Self, Self::Error> {
        let source = match (raw.column, raw.constant) {
            (Some(column), None) => FieldSource::Column(column),
            (None, Some(value)) => FieldSource::Constant(value),
            (Some(_), Some(_)) => {
                return Err(format!(
                    "field '{}' sets both column and constant",
                    raw.attribute
                ))
            },
            (None, None) => {
                return Err(format!(
                    "field '{}' needs a column or a constant",
                    raw.attribute
                ))
            },
        };
        Ok(Self {
            attribute: raw.attribute,
            source,
            kind: raw.kind,
            mandatory: raw.mandatory,
        })
    }
}

impl From<FieldMapping> for RawFieldMapping {
    fn from(mapping: FieldMapping) -> Self {
        let (column, constant) = match mapping.source {
            FieldSource::Column(c) => (Some(c), None),
            FieldSource::Constant(v) => (None, Some(v)),
        };
        Self {
            attribute: mapping.attribute,
            column,
            constant,
            kind: mapping.kind,
            mandatory: mapping.mandatory,
        }
    }
}

/// Mappings for one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSchema {
    /// File name relative to the watched folder
    pub name: String,

    /// Exact column count every row must have; when unset, rows only need to
    /// reach the highest mapped column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,

    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

impl FileSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: None,
            fields: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn field(mut self, mapping: FieldMapping) -> Self {
        self.fields.push(mapping);
        self
    }

    /// Smallest row width that satisfies every column mapping
    pub fn min_columns(&self) -> usize {
        self.fields
            .iter()
            .filter_map(|f| match f.source {
                FieldSource::Column(c) => Some(c + 1),
                FieldSource::Constant(_) => None,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Schemas for all source files of a loader type, in read order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeSchema {
    pub files: Vec<FileSchema>,
}

impl TypeSchema {
    pub fn new(files: Vec<FileSchema>) -> Self {
        Self { files }
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }
}
