//! Backend connectors: short-lived connections to the target stores.
//!
//! Every call opens its own connection or client, runs at most one operation and closes it before
//! returning; nothing is pooled across calls. Transport failures surface as
//! [`AppError::Connection`], a rejected operation as [`AppError::Provision`] (or
//! [`AppError::Conflict`] for duplicate objects).

mod document;
mod relational;

pub use document::DocumentConnector;
pub use relational::RelationalConnector;

use crate::error::AppError;
use crate::model::Credential;
use crate::translator::{CreateInstruction, DropInstruction, ExistenceCheck};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Row-level pass-through addressed by the generated API descriptors.
#[derive(Clone, Debug, PartialEq)]
pub enum RowOperation {
    List { table: String },
    Get { table: String, key: String, id: Value },
    Insert { table: String, row: Map<String, Value> },
    Update { table: String, key: String, id: Value, row: Map<String, Value> },
    Delete { table: String, key: String, id: Value },
}

#[derive(Clone, Debug, PartialEq)]
pub enum BackendOperation {
    CheckExists(ExistenceCheck),
    Create(CreateInstruction),
    Drop(DropInstruction),
    Rows(RowOperation),
}

impl BackendOperation {
    pub fn name(&self) -> &'static str {
        match self {
            BackendOperation::CheckExists(_) => "check_exists",
            BackendOperation::Create(_) => "create",
            BackendOperation::Drop(_) => "drop",
            BackendOperation::Rows(RowOperation::List { .. }) => "list_rows",
            BackendOperation::Rows(RowOperation::Get { .. }) => "get_row",
            BackendOperation::Rows(RowOperation::Insert { .. }) => "insert_row",
            BackendOperation::Rows(RowOperation::Update { .. }) => "update_row",
            BackendOperation::Rows(RowOperation::Delete { .. }) => "delete_row",
        }
    }

    /// Whether the operation changes backend state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            BackendOperation::CheckExists(_)
                | BackendOperation::Rows(RowOperation::List { .. })
                | BackendOperation::Rows(RowOperation::Get { .. })
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OperationOutcome {
    Exists(bool),
    Applied,
    Rows(Vec<Value>),
    Row(Option<Value>),
    /// Driver summary of a write (affected counts, generated ids).
    Written(Value),
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// `Ok(false)` only when the connector does not handle this credential's backend kind.
    async fn probe(&self, credential: &Credential) -> Result<bool, AppError>;

    async fn execute(&self, credential: &Credential, operation: BackendOperation) -> Result<OperationOutcome, AppError>;
}

/// Routes each call to the connector for the credential's backend kind.
#[derive(Clone, Debug, Default)]
pub struct BackendConnector {
    relational: RelationalConnector,
    document: DocumentConnector,
}

impl BackendConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for BackendConnector {
    async fn probe(&self, credential: &Credential) -> Result<bool, AppError> {
        match credential {
            Credential::Relational(_) => self.relational.probe(credential).await,
            Credential::Document(_) => self.document.probe(credential).await,
        }
    }

    async fn execute(&self, credential: &Credential, operation: BackendOperation) -> Result<OperationOutcome, AppError> {
        tracing::debug!(kind = %credential.kind(), operation = operation.name(), "backend call");
        match credential {
            Credential::Relational(_) => self.relational.execute(credential, operation).await,
            Credential::Document(_) => self.document.execute(credential, operation).await,
        }
    }
}

fn unsupported(kind: &str, operation: &BackendOperation) -> AppError {
    AppError::Provision(format!(
        "{} backend cannot run {} instruction built for another backend",
        kind,
        operation.name()
    ))
}
