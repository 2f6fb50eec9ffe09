//! Row body validation against a table's catalog columns.

use crate::error::AppError;
use crate::model::{validate_identifier, ColumnSpec};
use crate::translator::max_length_hint;
use serde_json::{Map, Value};

/// Coarse value class of a column, derived from either an engine type token or a logical type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueClass {
    Integer,
    Decimal,
    Bool,
    Text,
    Other,
}

impl ValueClass {
    pub fn of(data_type: &str) -> Self {
        let t = data_type.trim().to_uppercase();
        let base = t.split('(').next().unwrap_or("").trim();
        match base {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" | "NUMBER" => ValueClass::Integer,
            "DECIMAL" | "NUMERIC" | "FLOAT" | "DOUBLE" | "REAL" => ValueClass::Decimal,
            "BOOLEAN" | "BOOL" => ValueClass::Bool,
            "VARCHAR" | "CHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "STRING" => ValueClass::Text,
            _ => ValueClass::Other,
        }
    }
}

pub struct RowValidator;

impl RowValidator {
    /// Validate an insert body. All required columns must be present and non-null.
    pub fn validate(body: &Map<String, Value>, columns: &[ColumnSpec]) -> Result<(), AppError> {
        if body.is_empty() {
            return Err(AppError::InvalidInput("row must contain at least one column".into()));
        }
        for col in columns {
            let val = body.get(&col.name);
            if col.is_required && (val.is_none() || val == Some(&Value::Null)) {
                return Err(AppError::InvalidInput(format!("{} is required", col.name)));
            }
        }
        Self::validate_partial(body, columns)
    }

    /// Validate only the fields present in body (for updates). Required is not enforced for missing fields.
    pub fn validate_partial(body: &Map<String, Value>, columns: &[ColumnSpec]) -> Result<(), AppError> {
        if body.is_empty() {
            return Err(AppError::InvalidInput("row must contain at least one column".into()));
        }
        for (name, v) in body {
            validate_identifier("column", name)?;
            let col = columns
                .iter()
                .find(|c| &c.name == name)
                .ok_or_else(|| AppError::InvalidInput(format!("unknown column: {}", name)))?;
            validate_field(col, v)?;
        }
        Ok(())
    }
}

fn validate_field(col: &ColumnSpec, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        if col.is_required {
            return Err(AppError::InvalidInput(format!("{} is required", col.name)));
        }
        return Ok(());
    }
    match ValueClass::of(&col.data_type) {
        ValueClass::Integer if !(v.is_i64() || v.is_u64()) => {
            return Err(AppError::InvalidInput(format!("{} must be an integer", col.name)));
        }
        ValueClass::Decimal if !v.is_number() => {
            return Err(AppError::InvalidInput(format!("{} must be a number", col.name)));
        }
        ValueClass::Bool if !v.is_boolean() => {
            return Err(AppError::InvalidInput(format!("{} must be a boolean", col.name)));
        }
        ValueClass::Text if !v.is_string() => {
            return Err(AppError::InvalidInput(format!("{} must be a string", col.name)));
        }
        _ => {}
    }
    if let (Some(max), Some(s)) = (max_length_hint(&col.data_type), v.as_str()) {
        if s.chars().count() as u64 > max {
            return Err(AppError::InvalidInput(format!(
                "{} must be at most {} characters",
                col.name, max
            )));
        }
    }
    Ok(())
}

/// Parse a path id for the key column: integers for integer keys, text otherwise.
pub fn parse_key(col: &ColumnSpec, raw: &str) -> Result<Value, AppError> {
    match ValueClass::of(&col.data_type) {
        ValueClass::Integer => {
            let n: i64 = raw
                .parse()
                .map_err(|_| AppError::BadRequest(format!("invalid id for {}: {}", col.name, raw)))?;
            Ok(Value::Number(n.into()))
        }
        _ => Ok(Value::String(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec {
                name: "id".into(),
                data_type: "INT".into(),
                is_primary_key: true,
                is_unique: true,
                is_required: true,
            },
            ColumnSpec {
                name: "email".into(),
                data_type: "VARCHAR(8)".into(),
                is_primary_key: false,
                is_unique: true,
                is_required: false,
            },
            ColumnSpec {
                name: "active".into(),
                data_type: "bool".into(),
                is_primary_key: false,
                is_unique: false,
                is_required: false,
            },
        ]
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn insert_requires_required_columns() {
        let cols = columns();
        assert!(RowValidator::validate(&body(json!({"id": 1, "email": "a@b.c"})), &cols).is_ok());
        assert!(matches!(
            RowValidator::validate(&body(json!({"email": "a@b.c"})), &cols),
            Err(AppError::InvalidInput(_))
        ));
        assert!(RowValidator::validate(&body(json!({"id": null})), &cols).is_err());
    }

    #[test]
    fn update_checks_only_present_fields() {
        let cols = columns();
        assert!(RowValidator::validate_partial(&body(json!({"active": true})), &cols).is_ok());
        assert!(RowValidator::validate_partial(&body(json!({"active": "yes"})), &cols).is_err());
        assert!(RowValidator::validate_partial(&body(json!({"nope": 1})), &cols).is_err());
        assert!(RowValidator::validate_partial(&Map::new(), &cols).is_err());
    }

    #[test]
    fn varchar_length_is_enforced() {
        let cols = columns();
        assert!(RowValidator::validate_partial(&body(json!({"email": "12345678"})), &cols).is_ok());
        assert!(RowValidator::validate_partial(&body(json!({"email": "123456789"})), &cols).is_err());
    }

    #[test]
    fn keys_parse_by_column_class() {
        let cols = columns();
        assert_eq!(parse_key(&cols[0], "42").unwrap(), json!(42));
        assert!(matches!(parse_key(&cols[0], "abc"), Err(AppError::BadRequest(_))));
        assert_eq!(parse_key(&cols[1], "42").unwrap(), json!("42"));
        assert_eq!(ValueClass::of("number"), ValueClass::Integer);
        assert_eq!(ValueClass::of("string"), ValueClass::Text);
    }
}
