//! Row-set to record transformation

use crate::error::MappingError;
use crate::reader::RowSet;
use crate::record::Record;
use crate::schema::{FieldSource, FileSchema, TypeSchema};
use csv::StringRecord;

/// Turns one synchronized row-set into a flat record
pub trait RowTransform: Send {
    /// Build the record for `row_set`
    ///
    /// An `Ok` record may be empty when the row-set carried no values; the
    /// loader drops such records without grouping them.
    fn apply(&self, row_set: &RowSet) -> Result<Record, MappingError>;
}

/// [`RowTransform`] driven by a [`TypeSchema`]
///
/// Row `i` of a row-set is read with the schema of file `i`. Mappings that
/// target the same attribute are composed in order; empty optional values are
/// left out of the record.
#[derive(Debug, Clone)]
pub struct SchemaTransform {
    schema: TypeSchema,
}

impl SchemaTransform {
    pub fn new(schema: TypeSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &TypeSchema {
        &self.schema
    }

    fn apply_file(
        file: &FileSchema,
        row: &StringRecord,
        record: &mut Record,
    ) -> Result<(), MappingError> {
        let expected = file.columns.unwrap_or_else(|| file.min_columns());
        let width_ok = match file.columns {
            Some(exact) => row.len() == exact,
            None => row.len() >= expected,
        };
        if !width_ok {
            return Err(MappingError::ColumnCount {
                file: file.name.clone(),
                expected,
                actual: row.len(),
            });
        }

        for mapping in &file.fields {
            let raw = match &mapping.source {
                FieldSource::Column(c) => row.get(*c).unwrap_or_default(),
                FieldSource::Constant(value) => value.as_str(),
            };

            if raw.is_empty() {
                if mapping.mandatory {
                    return Err(MappingError::MissingMandatory {
                        attribute: mapping.attribute.clone(),
                    });
                }
                continue;
            }

            let value = mapping
                .kind
                .coerce(raw)
                .ok_or_else(|| MappingError::Coerce {
                    attribute: mapping.attribute.clone(),
                    kind: mapping.kind.to_string(),
                    value: raw.to_string(),
                })?;
            record.compose(&mapping.attribute, &value);
        }

        Ok(())
    }
}

impl RowTransform for SchemaTransform {
    fn apply(&self, row_set: &RowSet) -> Result<Record, MappingError> {
        if row_set.rows.len() != self.schema.files.len() {
            return Err(MappingError::FileCount {
                expected: self.schema.files.len(),
                actual: row_set.rows.len(),
            });
        }

        let mut record = Record::new();
        for (file, row) in self.schema.files.iter().zip(&row_set.rows) {
            Self::apply_file(file, row, &mut record)?;
        }
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::{FieldMapping, ValueKind};

    fn row_set(rows: &[&[&str]]) -> RowSet {
        RowSet {
            line: 1,
            rows: rows.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
        }
    }

    fn two_file_schema() -> TypeSchema {
        TypeSchema::new(vec![
            FileSchema::new("Attributes.csv")
                .columns(3)
                .field(FieldMapping::column("Tenant", 0).mandatory())
                .field(FieldMapping::column("ID", 1).mandatory())
                .field(FieldMapping::column("Weight", 2).kind(ValueKind::Float)),
            FileSchema::new("AttributeFilters.csv")
                .field(FieldMapping::column("FilterIDs", 0))
                .field(FieldMapping::constant("Blocker", "false")),
        ])
    }

    #[test]
    fn test_apply_merges_files() {
        let transform = SchemaTransform::new(two_file_schema());
        let record = transform
            .apply(&row_set(&[&["cgrates.org", "ATTR_1", "20"], &["*string:~*req.Account:1001"]]))
            .unwrap();

        assert_eq!(record.get("Tenant"), Some("cgrates.org"));
        assert_eq!(record.get("ID"), Some("ATTR_1"));
        assert_eq!(record.get("Weight"), Some("20"));
        assert_eq!(record.get("FilterIDs"), Some("*string:~*req.Account:1001"));
        assert_eq!(record.get("Blocker"), Some("false"));
    }

    #[test]
    fn test_exact_column_count_is_enforced() {
        let transform = SchemaTransform::new(two_file_schema());
        let err = transform
            .apply(&row_set(&[&["cgrates.org", "ATTR_1"], &["f"]]))
            .unwrap_err();

        assert_eq!(
            err,
            MappingError::ColumnCount {
                file: "Attributes.csv".to_string(),
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_short_row_without_declared_width() {
        let schema = TypeSchema::new(vec![FileSchema::new("a.csv")
            .field(FieldMapping::column("Tenant", 0))
            .field(FieldMapping::column("ID", 3))]);
        let err = SchemaTransform::new(schema)
            .apply(&row_set(&[&["t", "x"]]))
            .unwrap_err();
        assert!(matches!(err, MappingError::ColumnCount { expected: 4, actual: 2, .. }));
    }

    #[test]
    fn test_coercion_failure() {
        let transform = SchemaTransform::new(two_file_schema());
        let err = transform
            .apply(&row_set(&[&["cgrates.org", "ATTR_1", "heavy"], &["f"]]))
            .unwrap_err();
        assert!(matches!(err, MappingError::Coerce { ref attribute, .. } if attribute == "Weight"));
    }

    #[test]
    fn test_missing_mandatory() {
        let transform = SchemaTransform::new(two_file_schema());
        let err = transform
            .apply(&row_set(&[&["cgrates.org", "", "10"], &["f"]]))
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::MissingMandatory {
                attribute: "ID".to_string()
            }
        );
    }

    #[test]
    fn test_blank_row_set_gives_empty_record() {
        let schema = TypeSchema::new(vec![
            FileSchema::new("a.csv").field(FieldMapping::column("Tenant", 0)),
            FileSchema::new("b.csv").field(FieldMapping::column("ID", 0)),
        ]);
        let record = SchemaTransform::new(schema)
            .apply(&row_set(&[&[""], &[""]]))
            .unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_composed_attribute() {
        let schema = TypeSchema::new(vec![
            FileSchema::new("a.csv").field(FieldMapping::column("Path", 0)),
            FileSchema::new("b.csv").field(FieldMapping::column("Path", 0)),
        ]);
        let record = SchemaTransform::new(schema)
            .apply(&row_set(&[&["*req."], &["Account"]]))
            .unwrap();
        assert_eq!(record.get("Path"), Some("*req.Account"));
    }

    #[test]
    fn test_file_count_mismatch() {
        let transform = SchemaTransform::new(two_file_schema());
        let err = transform.apply(&row_set(&[&["a", "b", "1"]])).unwrap_err();
        assert_eq!(err, MappingError::FileCount { expected: 2, actual: 1 });
    }
}
