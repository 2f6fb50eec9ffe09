//! Input validation: identifier grammar, type tokens and primary-key rules.
//! Names reach DDL unparameterized, so everything interpolated goes through here first.

use crate::error::AppError;
use crate::model::ColumnSpec;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

pub const MAX_IDENTIFIER_LEN: usize = 64;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern")
});

/// Engine type tokens such as `INT`, `VARCHAR(255)`, `DECIMAL(10, 2)` or `DOUBLE PRECISION`.
static TYPE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*( [A-Za-z][A-Za-z0-9_]*)*(\(\d+( ?, ?\d+)?\))?$").expect("type token pattern")
});

/// Words allowed after the base type name. Anything else (`PRIMARY KEY`, `REFERENCES`, `DEFAULT`, ...)
/// would end up as a column constraint in the emitted DDL.
const TYPE_MODIFIERS: &[&str] = &["PRECISION", "VARYING", "UNSIGNED", "SIGNED", "ZEROFILL"];

pub fn validate_identifier(kind: &str, name: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::InvalidInput(format!("{} name is required", kind)));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(AppError::InvalidInput(format!(
            "{} name '{}' exceeds {} characters",
            kind, name, MAX_IDENTIFIER_LEN
        )));
    }
    if !IDENTIFIER.is_match(name) {
        return Err(AppError::InvalidInput(format!(
            "{} name '{}' must contain only letters, digits and underscores and not start with a digit",
            kind, name
        )));
    }
    Ok(())
}

pub fn validate_type_token(column: &str, data_type: &str) -> Result<(), AppError> {
    let token = data_type.trim();
    if !TYPE_TOKEN.is_match(token) {
        return Err(AppError::InvalidInput(format!(
            "column '{}' has invalid data type '{}'",
            column, data_type
        )));
    }
    let words = token.split('(').next().unwrap_or(token).split(' ').skip(1);
    if let Some(word) = words
        .filter(|w| !w.is_empty())
        .find(|w| !TYPE_MODIFIERS.iter().any(|m| m.eq_ignore_ascii_case(w)))
    {
        return Err(AppError::InvalidInput(format!(
            "column '{}' has invalid data type '{}': '{}' is not a type modifier; use the column flags for constraints",
            column, data_type, word
        )));
    }
    Ok(())
}

/// Exactly one primary key per create-table request.
pub fn validate_primary_key(columns: &[ColumnSpec]) -> Result<&ColumnSpec, AppError> {
    let mut pks = columns.iter().filter(|c| c.is_primary_key);
    match (pks.next(), pks.next()) {
        (Some(pk), None) => Ok(pk),
        (None, _) => Err(AppError::InvalidInput("exactly one primary key column is required, found none".into())),
        (Some(_), Some(_)) => {
            let names: Vec<&str> = columns.iter().filter(|c| c.is_primary_key).map(|c| c.name.as_str()).collect();
            Err(AppError::InvalidInput(format!(
                "exactly one primary key column is required, found {}: {}",
                names.len(),
                names.join(", ")
            )))
        }
    }
}

/// Full check of a create-table request before anything touches a backend.
pub fn validate_table(name: &str, columns: &[ColumnSpec]) -> Result<(), AppError> {
    validate_identifier("table", name)?;
    if columns.is_empty() {
        return Err(AppError::InvalidInput("at least one column is required".into()));
    }
    let mut seen = HashSet::new();
    for col in columns {
        validate_identifier("column", &col.name)?;
        validate_type_token(&col.name, &col.data_type)?;
        if !seen.insert(col.name.as_str()) {
            return Err(AppError::InvalidInput(format!("duplicate column name: {}", col.name)));
        }
    }
    validate_primary_key(columns)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, data_type: &str, pk: bool) -> ColumnSpec {
        ColumnSpec {
            name: name.into(),
            data_type: data_type.into(),
            is_primary_key: pk,
            is_unique: false,
            is_required: false,
        }
    }

    #[test]
    fn identifiers() {
        assert!(validate_identifier("table", "users").is_ok());
        assert!(validate_identifier("table", "_audit_log2").is_ok());
        assert!(validate_identifier("table", "").is_err());
        assert!(validate_identifier("table", "2fast").is_err());
        assert!(validate_identifier("table", "users; DROP TABLE x").is_err());
        assert!(validate_identifier("table", "na'me").is_err());
        assert!(validate_identifier("table", &"a".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }

    #[test]
    fn type_tokens() {
        for ok in ["INT", "VARCHAR(255)", "DECIMAL(10,2)", "DECIMAL(10, 2)", "DOUBLE PRECISION", "JSON"] {
            assert!(validate_type_token("c", ok).is_ok(), "{}", ok);
        }
        for ok in ["INT UNSIGNED", "bigint unsigned zerofill", "CHARACTER VARYING(64)"] {
            assert!(validate_type_token("c", ok).is_ok(), "{}", ok);
        }
        for bad in ["", "INT)", "VARCHAR(abc)", "INT, x INT", "TEXT -- comment"] {
            assert!(validate_type_token("c", bad).is_err(), "{}", bad);
        }
        for constraint in [
            "INT PRIMARY KEY",
            "INT UNIQUE",
            "INT NOT NULL",
            "INT REFERENCES accounts",
            "INT DEFAULT 0",
            "VARCHAR(10) COLLATE utf8mb4_bin",
            "INT AUTO_INCREMENT",
        ] {
            assert!(
                matches!(validate_type_token("c", constraint), Err(AppError::InvalidInput(_))),
                "{}",
                constraint
            );
        }
    }

    #[test]
    fn constraint_words_cannot_add_a_second_primary_key() {
        let cols = [col("id", "INT", true), col("other", "INT PRIMARY KEY", false)];
        assert!(matches!(validate_table("t", &cols), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn primary_key_count() {
        assert!(validate_primary_key(&[col("id", "INT", true), col("n", "TEXT", false)]).is_ok());
        assert!(matches!(
            validate_primary_key(&[col("id", "INT", false)]),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_primary_key(&[col("a", "INT", true), col("b", "INT", true)]),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn duplicate_columns_rejected() {
        let cols = [col("id", "INT", true), col("id", "TEXT", false)];
        assert!(validate_table("t", &cols).is_err());
    }
}
