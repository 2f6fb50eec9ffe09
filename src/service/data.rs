//! Row pass-through behind the generated descriptors. One probe, then one backend operation.

use super::provisioner::{require_owner, unexpected, Provisioner};
use super::validation::{parse_key, RowValidator};
use crate::connector::{BackendOperation, OperationOutcome, RowOperation};
use crate::error::AppError;
use crate::model::{ColumnSpec, TableEntry};
use serde_json::{Map, Value};
use uuid::Uuid;

fn key_column(entry: &TableEntry) -> Result<&ColumnSpec, AppError> {
    entry
        .table
        .primary_key()
        .ok_or_else(|| AppError::Provision(format!("table '{}' has no primary key column", entry.table.name)))
}

impl Provisioner {
    async fn run_rows(&self, entry: &TableEntry, op: RowOperation) -> Result<OperationOutcome, AppError> {
        let credential = self.resolve_credentials(&entry.database)?;
        self.confirm_reachable(&credential).await?;
        self.connector().execute(&credential, BackendOperation::Rows(op)).await
    }

    pub async fn list_rows(&self, owner: Option<&str>, table_id: Uuid) -> Result<Vec<Value>, AppError> {
        let owner = require_owner(owner)?;
        let entry = self.find_owned_table(owner, table_id).await?;
        let op = RowOperation::List {
            table: entry.table.name.clone(),
        };
        match self.run_rows(&entry, op).await? {
            OperationOutcome::Rows(rows) => Ok(rows),
            other => Err(unexpected("list rows", &other)),
        }
    }

    pub async fn get_row(&self, owner: Option<&str>, table_id: Uuid, id: &str) -> Result<Value, AppError> {
        let owner = require_owner(owner)?;
        let entry = self.find_owned_table(owner, table_id).await?;
        let key = key_column(&entry)?;
        let op = RowOperation::Get {
            table: entry.table.name.clone(),
            key: key.name.clone(),
            id: parse_key(key, id)?,
        };
        match self.run_rows(&entry, op).await? {
            OperationOutcome::Row(Some(row)) => Ok(row),
            OperationOutcome::Row(None) => Err(AppError::NotFound(format!("{} {} = {}", entry.table.name, key.name, id))),
            other => Err(unexpected("get row", &other)),
        }
    }

    pub async fn insert_row(&self, owner: Option<&str>, table_id: Uuid, row: Map<String, Value>) -> Result<Value, AppError> {
        let owner = require_owner(owner)?;
        let entry = self.find_owned_table(owner, table_id).await?;
        RowValidator::validate(&row, &entry.table.columns)?;
        let op = RowOperation::Insert {
            table: entry.table.name.clone(),
            row,
        };
        written(self.run_rows(&entry, op).await?, "insert row")
    }

    pub async fn update_row(
        &self,
        owner: Option<&str>,
        table_id: Uuid,
        id: &str,
        row: Map<String, Value>,
    ) -> Result<Value, AppError> {
        let owner = require_owner(owner)?;
        let entry = self.find_owned_table(owner, table_id).await?;
        let key = key_column(&entry)?;
        RowValidator::validate_partial(&row, &entry.table.columns)?;
        let op = RowOperation::Update {
            table: entry.table.name.clone(),
            key: key.name.clone(),
            id: parse_key(key, id)?,
            row,
        };
        written(self.run_rows(&entry, op).await?, "update row")
    }

    pub async fn delete_row(&self, owner: Option<&str>, table_id: Uuid, id: &str) -> Result<Value, AppError> {
        let owner = require_owner(owner)?;
        let entry = self.find_owned_table(owner, table_id).await?;
        let key = key_column(&entry)?;
        let op = RowOperation::Delete {
            table: entry.table.name.clone(),
            key: key.name.clone(),
            id: parse_key(key, id)?,
        };
        written(self.run_rows(&entry, op).await?, "delete row")
    }
}

fn written(outcome: OperationOutcome, step: &str) -> Result<Value, AppError> {
    match outcome {
        OperationOutcome::Written(summary) => Ok(summary),
        other => Err(unexpected(step, &other)),
    }
}
