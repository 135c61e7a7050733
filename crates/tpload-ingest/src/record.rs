//! Records, tenant keys and tenant groups

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator placed between the key attributes of a tenant id
pub const TENANT_ID_SEPARATOR: char = ':';

/// Flat attribute-name to value mapping built from one row-set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of an attribute, if the row-set produced one
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.fields.get(attribute).map(String::as_str)
    }

    /// Set an attribute, replacing any previous value
    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(attribute.into(), value.into());
    }

    /// Append to an attribute, creating it when absent
    ///
    /// Used for composed attributes fed by several mappings.
    pub fn compose(&mut self, attribute: &str, value: &str) {
        match self.fields.get_mut(attribute) {
            Some(existing) => existing.push_str(value),
            None => {
                self.fields.insert(attribute.to_string(), value.to_string());
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Grouping key of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed attributes a tenant id is derived from, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantKey(Vec<String>);

impl TenantKey {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(attributes.into_iter().map(Into::into).collect())
    }

    pub fn attributes(&self) -> &[String] {
        &self.0
    }

    /// Derive the tenant id of a record
    ///
    /// Values are joined with [`TENANT_ID_SEPARATOR`]; a missing attribute
    /// contributes an empty segment.
    pub fn tenant_id(&self, record: &Record) -> TenantId {
        let mut id = String::new();
        for (i, attribute) in self.0.iter().enumerate() {
            if i > 0 {
                id.push(TENANT_ID_SEPARATOR);
            }
            id.push_str(record.get(attribute).unwrap_or_default());
        }
        TenantId(id)
    }
}

impl Default for TenantKey {
    fn default() -> Self {
        Self::new(["Tenant", "ID"])
    }
}

/// Records sharing one tenant id, in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub tenant_id: TenantId,
    pub records: Vec<Record>,
}

impl Group {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
