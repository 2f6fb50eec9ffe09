//! Builds parameterized row statements for relational targets.
//! Table and column names must already satisfy the identifier grammar; values are always parameters.

use crate::error::AppError;
use crate::model::validate_identifier;
use serde_json::{Map, Value};

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new(sql: String) -> Self {
        QueryBuf { sql, params: Vec::new() }
    }

    fn push_param(&mut self, v: Value) {
        self.params.push(v);
    }
}

fn checked_columns(row: &Map<String, Value>) -> Result<Vec<&String>, AppError> {
    if row.is_empty() {
        return Err(AppError::InvalidInput("row must contain at least one column".into()));
    }
    let mut cols: Vec<&String> = row.keys().collect();
    cols.sort();
    for c in &cols {
        validate_identifier("column", c)?;
    }
    Ok(cols)
}

pub fn select_all(table: &str) -> Result<QueryBuf, AppError> {
    validate_identifier("table", table)?;
    Ok(QueryBuf::new(format!("SELECT * FROM {}", table)))
}

pub fn select_by_key(table: &str, key: &str, id: &Value) -> Result<QueryBuf, AppError> {
    validate_identifier("table", table)?;
    validate_identifier("column", key)?;
    let mut q = QueryBuf::new(format!("SELECT * FROM {} WHERE {} = ?", table, key));
    q.push_param(id.clone());
    Ok(q)
}

pub fn insert(table: &str, row: &Map<String, Value>) -> Result<QueryBuf, AppError> {
    validate_identifier("table", table)?;
    let cols = checked_columns(row)?;
    let placeholders = vec!["?"; cols.len()].join(", ");
    let names: Vec<&str> = cols.iter().map(|c| c.as_str()).collect();
    let mut q = QueryBuf::new(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders
    ));
    for c in cols {
        q.push_param(row[c.as_str()].clone());
    }
    Ok(q)
}

pub fn update(table: &str, key: &str, id: &Value, row: &Map<String, Value>) -> Result<QueryBuf, AppError> {
    validate_identifier("table", table)?;
    validate_identifier("column", key)?;
    let cols = checked_columns(row)?;
    let sets: Vec<String> = cols.iter().map(|c| format!("{} = ?", c)).collect();
    let mut q = QueryBuf::new(format!("UPDATE {} SET {} WHERE {} = ?", table, sets.join(", "), key));
    for c in cols {
        q.push_param(row[c.as_str()].clone());
    }
    q.push_param(id.clone());
    Ok(q)
}

pub fn delete(table: &str, key: &str, id: &Value) -> Result<QueryBuf, AppError> {
    validate_identifier("table", table)?;
    validate_identifier("column", key)?;
    let mut q = QueryBuf::new(format!("DELETE FROM {} WHERE {} = ?", table, key));
    q.push_param(id.clone());
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn insert_binds_values_in_column_order() {
        let q = insert("users", &row(json!({"name": "ada", "id": 1}))).unwrap();
        assert_eq!(q.sql, "INSERT INTO users (id, name) VALUES (?, ?)");
        assert_eq!(q.params, vec![json!(1), json!("ada")]);
    }

    #[test]
    fn update_appends_key_param() {
        let q = update("users", "id", &json!(7), &row(json!({"name": "bob"}))).unwrap();
        assert_eq!(q.sql, "UPDATE users SET name = ? WHERE id = ?");
        assert_eq!(q.params, vec![json!("bob"), json!(7)]);
    }

    #[test]
    fn column_names_are_checked() {
        assert!(insert("users", &row(json!({"name) VALUES (1); --": 1}))).is_err());
        assert!(insert("users", &Map::new()).is_err());
        assert!(select_by_key("users", "id = 1 OR 1", &json!(1)).is_err());
    }

    #[test]
    fn select_and_delete() {
        assert_eq!(select_all("users").unwrap().sql, "SELECT * FROM users");
        let q = delete("users", "id", &json!("a")).unwrap();
        assert_eq!(q.sql, "DELETE FROM users WHERE id = ?");
        assert_eq!(q.params.len(), 1);
    }
}
