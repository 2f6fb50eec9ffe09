//! MongoDB-family connector over a single client per call.

use super::{unsupported, BackendOperation, Connector, OperationOutcome, RowOperation};
use crate::error::AppError;
use crate::model::{Credential, DocumentCredential};
use crate::translator::{CreateInstruction, DropInstruction, ExistenceCheck};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ValidationAction, ValidationLevel};
use mongodb::{Client, Database};
use serde_json::{Map, Value};

/// Database used when the URI names none, matching the driver's own default.
const DEFAULT_DATABASE: &str = "test";
const NAMESPACE_EXISTS: i32 = 48;
const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentConnector;

async fn connect(c: &DocumentCredential) -> Result<Client, AppError> {
    Client::with_uri_str(&c.uri)
        .await
        .map_err(|e| AppError::Connection(e.to_string()))
}

fn target_database(client: &Client) -> Database {
    client
        .default_database()
        .unwrap_or_else(|| client.database(DEFAULT_DATABASE))
}

fn classify(err: mongodb::error::Error) -> AppError {
    match err.kind.as_ref() {
        ErrorKind::Command(c) if c.code == NAMESPACE_EXISTS => AppError::Conflict(c.message.clone()),
        ErrorKind::Write(WriteFailure::WriteError(w)) if w.code == DUPLICATE_KEY => AppError::Conflict(w.message.clone()),
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::Authentication { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => AppError::Connection(err.to_string()),
        _ => AppError::Provision(err.to_string()),
    }
}

fn validation_action(raw: &str) -> ValidationAction {
    match raw {
        "warn" => ValidationAction::Warn,
        _ => ValidationAction::Error,
    }
}

fn validation_level(raw: &str) -> ValidationLevel {
    match raw {
        "strict" => ValidationLevel::Strict,
        "off" => ValidationLevel::Off,
        _ => ValidationLevel::Moderate,
    }
}

fn to_document(row: &Map<String, Value>) -> Result<Document, AppError> {
    bson::to_document(row).map_err(|e| AppError::InvalidInput(format!("row is not a valid document: {}", e)))
}

fn key_filter(key: &str, id: &Value) -> Result<Document, AppError> {
    let id = bson::to_bson(id).map_err(|e| AppError::InvalidInput(format!("invalid id: {}", e)))?;
    let mut filter = Document::new();
    filter.insert(key, id);
    Ok(filter)
}

fn document_to_json(d: Document) -> Value {
    Bson::Document(d).into_relaxed_extjson()
}

async fn collection_exists(db: &Database, name: &str) -> Result<bool, AppError> {
    let names = db
        .list_collection_names()
        .filter(doc! { "name": name })
        .await
        .map_err(classify)?;
    Ok(!names.is_empty())
}

async fn run(db: &Database, operation: BackendOperation) -> Result<OperationOutcome, AppError> {
    match operation {
        BackendOperation::CheckExists(ExistenceCheck::Collection { name }) => {
            Ok(OperationOutcome::Exists(collection_exists(db, &name).await?))
        }
        BackendOperation::Create(CreateInstruction::Collection {
            name,
            validator,
            validation_action: action,
            validation_level: level,
        }) => {
            let mut create = db.create_collection(&name);
            if let Some(v) = validator {
                let validator = bson::to_document(&v)
                    .map_err(|e| AppError::Provision(format!("validator is not a document: {}", e)))?;
                create = create
                    .validator(validator)
                    .validation_action(validation_action(action))
                    .validation_level(validation_level(level));
            }
            create.await.map_err(classify)?;
            Ok(OperationOutcome::Applied)
        }
        BackendOperation::Drop(DropInstruction::Collection { name }) => {
            // The server treats dropping a missing collection as success; report it instead.
            if !collection_exists(db, &name).await? {
                return Err(AppError::Provision(format!("collection '{}' does not exist", name)));
            }
            db.collection::<Document>(&name).drop().await.map_err(classify)?;
            Ok(OperationOutcome::Applied)
        }
        BackendOperation::Rows(op) => run_rows(db, op).await,
        other => Err(unsupported("document", &other)),
    }
}

async fn run_rows(db: &Database, op: RowOperation) -> Result<OperationOutcome, AppError> {
    match op {
        RowOperation::List { table } => {
            let cursor = db.collection::<Document>(&table).find(doc! {}).await.map_err(classify)?;
            let docs: Vec<Document> = cursor.try_collect().await.map_err(classify)?;
            Ok(OperationOutcome::Rows(docs.into_iter().map(document_to_json).collect()))
        }
        RowOperation::Get { table, key, id } => {
            let found = db
                .collection::<Document>(&table)
                .find_one(key_filter(&key, &id)?)
                .await
                .map_err(classify)?;
            Ok(OperationOutcome::Row(found.map(document_to_json)))
        }
        RowOperation::Insert { table, row } => {
            let result = db
                .collection::<Document>(&table)
                .insert_one(to_document(&row)?)
                .await
                .map_err(classify)?;
            Ok(OperationOutcome::Written(serde_json::json!({
                "insertedId": result.inserted_id.into_relaxed_extjson(),
            })))
        }
        RowOperation::Update { table, key, id, row } => {
            let result = db
                .collection::<Document>(&table)
                .update_one(key_filter(&key, &id)?, doc! { "$set": to_document(&row)? })
                .await
                .map_err(classify)?;
            Ok(OperationOutcome::Written(serde_json::json!({
                "matchedCount": result.matched_count,
                "modifiedCount": result.modified_count,
            })))
        }
        RowOperation::Delete { table, key, id } => {
            let result = db
                .collection::<Document>(&table)
                .delete_one(key_filter(&key, &id)?)
                .await
                .map_err(classify)?;
            Ok(OperationOutcome::Written(serde_json::json!({ "deletedCount": result.deleted_count })))
        }
    }
}

#[async_trait]
impl Connector for DocumentConnector {
    async fn probe(&self, credential: &Credential) -> Result<bool, AppError> {
        let Credential::Document(c) = credential else {
            return Ok(false);
        };
        let client = connect(c).await?;
        let listed = client.list_database_names().await;
        client.shutdown().await;
        listed.map_err(|e| AppError::Connection(e.to_string()))?;
        Ok(true)
    }

    async fn execute(&self, credential: &Credential, operation: BackendOperation) -> Result<OperationOutcome, AppError> {
        let Credential::Document(c) = credential else {
            return Err(unsupported("document", &operation));
        };
        let client = connect(c).await?;
        let db = target_database(&client);
        let result = run(&db, operation).await;
        drop(db);
        client.shutdown().await;
        result
    }
}
