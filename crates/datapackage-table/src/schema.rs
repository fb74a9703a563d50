use crate::{Field, Record, TableError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MISSING_VALUES: [&str; 1] = [""];

fn default_missing_values() -> Vec<String> {
    DEFAULT_MISSING_VALUES.iter().map(|s| (*s).to_owned()).collect()
}

/// The `schema` object of a tabular resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub fields: Vec<Field>,
    #[serde(default = "default_missing_values")]
    pub missing_values: Vec<String>,
}

impl TableSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            missing_values: default_missing_values(),
        }
    }

    /// Parse a schema object. At least one field is required.
    pub fn from_value(value: &Value) -> Result<Self, TableError> {
        if !value.is_object() {
            return Err(TableError::InvalidSchema(
                "schema must be a JSON object".to_owned(),
            ));
        }
        let schema: Self = serde_json::from_value(value.clone())
            .map_err(|e| TableError::InvalidSchema(e.to_string()))?;
        if schema.fields.is_empty() {
            return Err(TableError::InvalidSchema(
                "schema must define at least one field".to_owned(),
            ));
        }
        Ok(schema)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn check_header(&self, header: &[String]) -> Result<(), TableError> {
        if header.len() == self.fields.len() {
            Ok(())
        } else {
            Err(TableError::HeaderMismatch {
                expected: self.fields.len(),
                found: header.len(),
            })
        }
    }

    /// Cast positional cells; `cells` must have one entry per field.
    pub fn cast_row(&self, cells: &[Value]) -> Result<Record, TableError> {
        if cells.len() != self.fields.len() {
            return Err(TableError::RowLength {
                expected: self.fields.len(),
                found: cells.len(),
            });
        }
        self.fields
            .iter()
            .zip(cells)
            .map(|(field, cell)| Ok((field.name.clone(), field.cast(cell, &self.missing_values)?)))
            .collect()
    }

    /// Cast a field-name keyed record. Fields absent from the record are
    /// treated as missing; extra keys are dropped.
    pub fn cast_record(&self, record: &Record) -> Result<Record, TableError> {
        self.fields
            .iter()
            .map(|field| {
                let cell = record.get(&field.name).unwrap_or(&Value::Null);
                Ok((field.name.clone(), field.cast(cell, &self.missing_values)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldType;
    use serde_json::json;

    fn schema() -> TableSchema {
        TableSchema::from_value(&json!({
            "fields": [
                {"name": "id", "type": "integer"},
                {"name": "name", "type": "string"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn parses_fields_and_default_missing_values() {
        let s = schema();
        assert_eq!(s.field_names(), vec!["id", "name"]);
        assert_eq!(s.fields[0].field_type, FieldType::Integer);
        assert_eq!(s.missing_values, vec![String::new()]);
    }

    #[test]
    fn custom_missing_values() {
        let s = TableSchema::from_value(&json!({
            "fields": [{"name": "x", "type": "number"}],
            "missingValues": ["NA", "-"]
        }))
        .unwrap();
        let row = s.cast_row(&[json!("NA")]).unwrap();
        assert_eq!(row["x"], Value::Null);
        assert!(s.cast_row(&[json!("")]).is_err());
    }

    #[test]
    fn rejects_bad_schemas() {
        assert!(TableSchema::from_value(&json!("schema.json")).is_err());
        assert!(TableSchema::from_value(&json!({})).is_err());
        assert!(TableSchema::from_value(&json!({"fields": []})).is_err());
    }

    #[test]
    fn cast_row_checks_length() {
        let s = schema();
        let row = s.cast_row(&[json!("1"), json!("one")]).unwrap();
        assert_eq!(Value::Object(row), json!({"id": 1, "name": "one"}));
        let err = s.cast_row(&[json!("1")]).unwrap_err();
        assert!(matches!(err, TableError::RowLength { expected: 2, found: 1 }));
    }

    #[test]
    fn cast_record_orders_by_schema() {
        let s = schema();
        let input = json!({"name": "two", "id": 2, "extra": true});
        let row = s.cast_record(input.as_object().unwrap()).unwrap();
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name"]);
    }

    #[test]
    fn header_check() {
        let s = schema();
        assert!(s.check_header(&["id".to_owned(), "name".to_owned()]).is_ok());
        assert!(matches!(
            s.check_header(&["id".to_owned()]),
            Err(TableError::HeaderMismatch { expected: 2, found: 1 })
        ));
    }
}
