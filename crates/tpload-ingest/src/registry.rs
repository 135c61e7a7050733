//! Loader type registrations
//!
//! Every loader type brings its own files, row transform, tenant key and
//! commit sink. Adding a data type means registering one more
//! [`TypeRegistration`]; the loader itself has no per-type branches.

use crate::error::{LoaderError, Result};
use crate::record::TenantKey;
use crate::schema::TypeSchema;
use crate::sink::CommitSink;
use crate::transform::{RowTransform, SchemaTransform};

/// Everything the loader needs to process one loader type
pub struct TypeRegistration {
    pub loader_type: String,
    /// Source file names, in row-set order
    pub files: Vec<String>,
    pub tenant_key: TenantKey,
    pub transform: Box<dyn RowTransform>,
    pub sink: Box<dyn CommitSink>,
}

impl TypeRegistration {
    /// Register a type whose rows are mapped by `schema`
    pub fn from_schema(
        loader_type: impl Into<String>,
        schema: TypeSchema,
        tenant_key: TenantKey,
        sink: impl CommitSink + 'static,
    ) -> Self {
        let files = schema.file_names().map(str::to_string).collect();
        Self {
            loader_type: loader_type.into(),
            files,
            tenant_key,
            transform: Box::new(SchemaTransform::new(schema)),
            sink: Box::new(sink),
        }
    }

    /// Register a type with a custom transform
    pub fn new(
        loader_type: impl Into<String>,
        files: Vec<String>,
        tenant_key: TenantKey,
        transform: impl RowTransform + 'static,
        sink: impl CommitSink + 'static,
    ) -> Self {
        Self {
            loader_type: loader_type.into(),
            files,
            tenant_key,
            transform: Box::new(transform),
            sink: Box::new(sink),
        }
    }
}

impl std::fmt::Debug for TypeRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistration")
            .field("loader_type", &self.loader_type)
            .field("files", &self.files)
            .field("tenant_key", &self.tenant_key)
            .finish_non_exhaustive()
    }
}

/// Registered loader types, processed in registration order
#[derive(Debug, Default)]
pub struct LoaderRegistry {
    types: Vec<TypeRegistration>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type; names must be unique and each type needs at least one file
    pub fn register(&mut self, registration: TypeRegistration) -> Result<()> {
        if registration.files.is_empty() {
            return Err(LoaderError::config(format!(
                "loader type '{}' has no source files",
                registration.loader_type
            )));
        }
        if self.get(&registration.loader_type).is_some() {
            return Err(LoaderError::config(format!(
                "loader type '{}' is registered twice",
                registration.loader_type
            )));
        }
        self.types.push(registration);
        Ok(())
    }

    pub fn get(&self, loader_type: &str) -> Option<&TypeRegistration> {
        self.types.iter().find(|t| t.loader_type == loader_type)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.loader_type.as_str())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TypeRegistration> {
        self.types.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::{FieldMapping, FileSchema};
    use crate::sink::LogSink;

    fn attributes() -> TypeRegistration {
        TypeRegistration::from_schema(
            "*attributes",
            TypeSchema::new(vec![
                FileSchema::new("Attributes.csv").field(FieldMapping::column("Tenant", 0))
            ]),
            TenantKey::default(),
            LogSink,
        )
    }

    #[test]
    fn test_register_keeps_order_and_files() {
        let mut registry = LoaderRegistry::new();
        registry.register(attributes()).unwrap();
        registry
            .register(TypeRegistration::from_schema(
                "*filters",
                TypeSchema::new(vec![FileSchema::new("Filters.csv")]),
                TenantKey::default(),
                LogSink,
            ))
            .unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["*attributes", "*filters"]);
        assert_eq!(registry.get("*attributes").unwrap().files, vec!["Attributes.csv"]);
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut registry = LoaderRegistry::new();
        registry.register(attributes()).unwrap();
        assert!(matches!(registry.register(attributes()), Err(LoaderError::Config(_))));
    }

    #[test]
    fn test_type_without_files_rejected() {
        let mut registry = LoaderRegistry::new();
        let empty = TypeRegistration::from_schema(
            "*empty",
            TypeSchema::default(),
            TenantKey::default(),
            LogSink,
        );
        assert!(registry.register(empty).is_err());
        assert!(registry.is_empty());
    }
}
