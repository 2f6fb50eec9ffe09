//! Collection validators for document (MongoDB-family) targets.

use super::{CreateInstruction, DropInstruction, ExistenceCheck, SchemaTranslator, VALIDATION_ACTION, VALIDATION_LEVEL};
use crate::error::AppError;
use crate::model::{validate_identifier, validate_table, BackendKind, ColumnSpec};
use serde_json::{json, Map, Value};

/// Identity field the store manages itself; never listed as required.
pub const IDENTITY_FIELD: &str = "_id";

#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentTranslator;

/// Logical type for a relational type token. `None` for tokens outside the vocabulary.
pub fn logical_type(data_type: &str) -> Option<&'static str> {
    let token = data_type.trim().to_uppercase();
    let mapped = match token.as_str() {
        "INT" => "number",
        "VARCHAR(255)" | "TEXT" => "string",
        "BOOLEAN" => "bool",
        "DATE" | "DATETIME" => "date",
        "DECIMAL" => "decimal",
        "JSON" => "object",
        _ if max_length_hint(&token).is_some() => "string",
        _ => return None,
    };
    Some(mapped)
}

/// Numeric suffix of a `VARCHAR(n)` token.
pub fn max_length_hint(data_type: &str) -> Option<u64> {
    let token = data_type.trim().to_uppercase();
    let rest = token.strip_prefix("VARCHAR")?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    inner.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

fn field_schema(col: &ColumnSpec) -> Result<Value, AppError> {
    let bson_type = logical_type(&col.data_type).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "column '{}' has data type '{}' with no document mapping",
            col.name, col.data_type
        ))
    })?;
    let mut props = Map::new();
    props.insert("bsonType".into(), Value::from(bson_type));
    if col.is_unique {
        props.insert("uniqueItems".into(), Value::Bool(true));
    }
    if let Some(max) = max_length_hint(&col.data_type) {
        props.insert("maxLength".into(), Value::from(max));
    }
    Ok(Value::Object(props))
}

fn validator(columns: &[ColumnSpec]) -> Result<Option<Value>, AppError> {
    if columns.is_empty() {
        return Ok(None);
    }
    let required: Vec<&str> = columns
        .iter()
        .filter(|c| c.is_required && c.name != IDENTITY_FIELD)
        .map(|c| c.name.as_str())
        .collect();
    let mut properties = Map::new();
    for col in columns {
        properties.insert(col.name.clone(), field_schema(col)?);
    }
    Ok(Some(json!({
        "$jsonSchema": {
            "bsonType": "object",
            "required": required,
            "properties": properties,
        }
    })))
}

impl SchemaTranslator for DocumentTranslator {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn create_instruction(&self, table: &str, columns: &[ColumnSpec]) -> Result<CreateInstruction, AppError> {
        validate_table(table, columns)?;
        Ok(CreateInstruction::Collection {
            name: table.to_string(),
            validator: validator(columns)?,
            validation_action: VALIDATION_ACTION,
            validation_level: VALIDATION_LEVEL,
        })
    }

    fn existence_check(&self, table: &str) -> Result<ExistenceCheck, AppError> {
        validate_identifier("collection", table)?;
        Ok(ExistenceCheck::Collection { name: table.to_string() })
    }

    fn drop_instruction(&self, table: &str) -> Result<DropInstruction, AppError> {
        validate_identifier("collection", table)?;
        Ok(DropInstruction::Collection { name: table.to_string() })
    }

    fn catalog_data_type(&self, column: &ColumnSpec) -> Result<String, AppError> {
        logical_type(&column.data_type)
            .map(String::from)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown data type: {}", column.data_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, data_type: &str, pk: bool, unique: bool, required: bool) -> ColumnSpec {
        ColumnSpec {
            name: name.into(),
            data_type: data_type.into(),
            is_primary_key: pk,
            is_unique: unique,
            is_required: required,
        }
    }

    #[test]
    fn lookup_table() {
        assert_eq!(logical_type("INT"), Some("number"));
        assert_eq!(logical_type("VARCHAR(255)"), Some("string"));
        assert_eq!(logical_type("varchar(40)"), Some("string"));
        assert_eq!(logical_type("TEXT"), Some("string"));
        assert_eq!(logical_type("BOOLEAN"), Some("bool"));
        assert_eq!(logical_type("DATETIME"), Some("date"));
        assert_eq!(logical_type("DECIMAL"), Some("decimal"));
        assert_eq!(logical_type("JSON"), Some("object"));
        assert_eq!(logical_type("BLOB"), None);
    }

    #[test]
    fn max_length_from_varchar() {
        assert_eq!(max_length_hint("VARCHAR(255)"), Some(255));
        assert_eq!(max_length_hint("VARCHAR (12)"), Some(12));
        assert_eq!(max_length_hint("TEXT"), None);
        assert_eq!(max_length_hint("VARCHAR(0)"), None);
    }

    #[test]
    fn users_collection_validator() {
        let cols = vec![col("id", "INT", true, true, true)];
        let instruction = DocumentTranslator.create_instruction("users", &cols).unwrap();
        match instruction {
            CreateInstruction::Collection {
                name,
                validator,
                validation_action,
                validation_level,
            } => {
                assert_eq!(name, "users");
                assert_eq!(validation_action, "error");
                assert_eq!(validation_level, "moderate");
                let schema = &validator.unwrap()["$jsonSchema"];
                assert_eq!(schema["required"], json!(["id"]));
                assert_eq!(schema["properties"]["id"]["bsonType"], "number");
                assert_eq!(schema["properties"]["id"]["uniqueItems"], true);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn identity_field_is_never_required() {
        let cols = vec![col("_id", "INT", true, false, true), col("name", "VARCHAR(64)", false, false, true)];
        match DocumentTranslator.create_instruction("people", &cols).unwrap() {
            CreateInstruction::Collection { validator, .. } => {
                let schema = &validator.unwrap()["$jsonSchema"];
                assert_eq!(schema["required"], json!(["name"]));
                assert_eq!(schema["properties"]["name"]["maxLength"], 64);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unmapped_type_is_invalid_input() {
        let cols = vec![col("id", "INT", true, false, false), col("blob", "BLOB", false, false, false)];
        assert!(matches!(
            DocumentTranslator.create_instruction("files", &cols),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn catalog_type_is_logical() {
        let c = col("id", "INT", true, false, false);
        assert_eq!(DocumentTranslator.catalog_data_type(&c).unwrap(), "number");
    }
}
