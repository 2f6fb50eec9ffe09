//! Provisioning orchestrator: credentials → probe → existence check → backend mutation → catalog write.
//!
//! The backend is always mutated before the catalog. A catalog failure after a successful backend
//! mutation is logged and returned; nothing is rolled back.

use super::apis;
use super::stage::{ProvisionStage, StageTracker};
use crate::catalog::CatalogStore;
use crate::connector::{BackendOperation, Connector, OperationOutcome};
use crate::error::AppError;
use crate::model::{
    ApiDescriptor, ColumnSpec, Credential, DatabaseRecord, NewDatabase, TableEntry, TableRecord, TableSpec,
};
use crate::translator::{translator_for, SchemaTranslator};
use crate::vault::{Decrypted, Vault};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

/// Emitted after the catalog reflects a backend change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CatalogEvent {
    #[serde(rename_all = "camelCase")]
    TableCreated { database_id: Uuid, table_id: Uuid, name: String },
    #[serde(rename_all = "camelCase")]
    TableDropped { database_id: Uuid, table_id: Uuid, name: String },
    #[serde(rename_all = "camelCase")]
    DatabaseDeleted { database_id: Uuid },
}

/// Body of a credential registration.
#[derive(Clone, Debug, Deserialize)]
pub struct RegisterDatabase {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub credential: Credential,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

pub struct Provisioner {
    vault: Vault,
    connector: Arc<dyn Connector>,
    catalog: Arc<dyn CatalogStore>,
    events: broadcast::Sender<CatalogEvent>,
}

pub(crate) fn require_owner(owner: Option<&str>) -> Result<&str, AppError> {
    owner
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .ok_or_else(|| AppError::Unauthorized("no authenticated owner".into()))
}

impl Provisioner {
    pub fn new(vault: Vault, connector: Arc<dyn Connector>, catalog: Arc<dyn CatalogStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            vault,
            connector,
            catalog,
            events,
        }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: CatalogEvent) {
        // No receivers is not an error.
        let _ = self.events.send(event);
    }

    pub(crate) fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    /// Decrypt a stored blob back into connection parameters.
    pub(crate) fn resolve_credentials(&self, database: &DatabaseRecord) -> Result<Credential, AppError> {
        match self.vault.decrypt(&database.credentials)? {
            Decrypted::Record(record) => Credential::from_payload(database.kind, record),
            Decrypted::Text(_) => Err(AppError::Vault(format!(
                "credentials of database {} are not a key/value record",
                database.id
            ))),
        }
    }

    /// Probe once; `Ok(false)` means no connector handles the kind, which fails the step like a refused connection.
    pub(crate) async fn confirm_reachable(&self, credential: &Credential) -> Result<(), AppError> {
        if self.connector.probe(credential).await? {
            Ok(())
        } else {
            Err(AppError::Connection(format!("no connector for {} backends", credential.kind())))
        }
    }

    pub(crate) async fn find_owned_table(&self, owner: &str, table_id: Uuid) -> Result<TableEntry, AppError> {
        self.catalog
            .find_table(table_id)
            .await?
            .filter(|e| e.database.owner_id == owner)
            .ok_or_else(|| AppError::NotFound(format!("table {}", table_id)))
    }

    async fn find_owned_database(&self, owner: &str, database_id: Uuid) -> Result<DatabaseRecord, AppError> {
        self.catalog
            .find_database(database_id, owner)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("database {}", database_id)))
    }

    /// Encrypt and store connection parameters for the caller.
    pub async fn register_credentials(&self, owner: Option<&str>, request: RegisterDatabase) -> Result<DatabaseRecord, AppError> {
        let owner = require_owner(owner)?;
        let payload = request.credential.to_payload();
        let credentials = self.vault.encrypt_value(&payload)?;
        let record = self
            .catalog
            .create_database(NewDatabase {
                owner_id: owner.to_string(),
                name: request.name.filter(|n| !n.trim().is_empty()),
                kind: request.credential.kind(),
                credentials,
            })
            .await?;
        tracing::info!(database_id = %record.id, kind = %record.kind, "credentials registered");
        Ok(record)
    }

    /// Probe without storing anything. Transport errors come back as `Err` with the driver's message.
    pub async fn test_connection(&self, credential: &Credential) -> Result<bool, AppError> {
        self.connector.probe(credential).await
    }

    pub async fn list_databases(&self, owner: Option<&str>) -> Result<Vec<DatabaseRecord>, AppError> {
        let owner = require_owner(owner)?;
        self.catalog.list_databases(owner).await
    }

    pub async fn get_database(&self, owner: Option<&str>, database_id: Uuid) -> Result<DatabaseRecord, AppError> {
        let owner = require_owner(owner)?;
        self.find_owned_database(owner, database_id).await
    }

    pub async fn list_tables(&self, owner: Option<&str>, database_id: Uuid) -> Result<Vec<TableRecord>, AppError> {
        let owner = require_owner(owner)?;
        let database = self.find_owned_database(owner, database_id).await?;
        self.catalog.list_tables(database.id).await
    }

    pub async fn get_table(&self, owner: Option<&str>, table_id: Uuid) -> Result<TableRecord, AppError> {
        let owner = require_owner(owner)?;
        Ok(self.find_owned_table(owner, table_id).await?.table)
    }

    /// Create the backend object, record it in the catalog, then publish its API descriptors.
    pub async fn create_table(
        &self,
        owner: Option<&str>,
        database_id: Uuid,
        request: CreateTable,
    ) -> Result<TableRecord, AppError> {
        let owner = require_owner(owner)?;
        let database = self.find_owned_database(owner, database_id).await?;
        let name = request.name.trim().to_string();

        // Everything that can be rejected locally is rejected before the backend is contacted.
        let translator = translator_for(database.kind);
        let create = translator.create_instruction(&name, &request.columns)?;
        let exists = translator.existence_check(&name)?;
        let columns = request
            .columns
            .iter()
            .map(|c| {
                Ok(ColumnSpec {
                    data_type: translator.catalog_data_type(c)?,
                    ..c.clone()
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let mut stage = StageTracker::new("create_table", &name);
        let credential = stage.check(self.resolve_credentials(&database))?;
        stage.advance(ProvisionStage::CredentialsResolved)?;

        stage.check(self.confirm_reachable(&credential).await)?;
        stage.advance(ProvisionStage::ReachabilityConfirmed)?;

        let outcome = stage.check(self.connector.execute(&credential, BackendOperation::CheckExists(exists)).await)?;
        let already = match outcome {
            OperationOutcome::Exists(b) => b,
            other => return stage.check(Err(unexpected("existence check", &other))),
        };
        if already {
            return stage.check(Err(AppError::Conflict(format!(
                "{} '{}' already exists",
                object_noun(&database),
                name
            ))));
        }
        stage.advance(ProvisionStage::ExistenceChecked)?;

        stage.check(self.connector.execute(&credential, BackendOperation::Create(create)).await)?;
        stage.advance(ProvisionStage::Mutated)?;

        let written = self
            .catalog
            .create_table(TableSpec {
                name: name.clone(),
                database_id: database.id,
                columns,
            })
            .await;
        let mut table = match written {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(
                    database_id = %database.id,
                    table = %name,
                    error = %e,
                    "backend object created but catalog write failed; object is orphaned"
                );
                return stage.check(Err(e));
            }
        };
        stage.advance(ProvisionStage::CatalogWritten)?;

        let published = apis::publish(self.catalog.as_ref(), table.id, &table.name).await;
        // The table exists in the backend and the catalog either way.
        self.notify(CatalogEvent::TableCreated {
            database_id: database.id,
            table_id: table.id,
            name: table.name.clone(),
        });
        table.apis = match published {
            Ok(apis) => apis,
            Err(e) => {
                tracing::error!(
                    database_id = %database.id,
                    table_id = %table.id,
                    table = %table.name,
                    error = %e,
                    "table provisioned but descriptor publishing failed; descriptors may be partial"
                );
                return Err(e);
            }
        };
        tracing::info!(database_id = %database.id, table_id = %table.id, table = %table.name, "table provisioned");
        Ok(table)
    }

    /// Drop the backend object, then the catalog row. A failed backend drop leaves the catalog untouched.
    pub async fn drop_table(&self, owner: Option<&str>, table_id: Uuid) -> Result<(), AppError> {
        let owner = require_owner(owner)?;
        let entry = self.find_owned_table(owner, table_id).await?;
        self.drop_entry(&entry.database, &entry.table).await
    }

    async fn drop_entry(&self, database: &DatabaseRecord, table: &TableRecord) -> Result<(), AppError> {
        let drop = translator_for(database.kind).drop_instruction(&table.name)?;

        let mut stage = StageTracker::new("drop_table", &table.name);
        let credential = stage.check(self.resolve_credentials(database))?;
        stage.advance(ProvisionStage::CredentialsResolved)?;

        stage.check(self.confirm_reachable(&credential).await)?;
        stage.advance(ProvisionStage::ReachabilityConfirmed)?;

        stage.check(self.connector.execute(&credential, BackendOperation::Drop(drop)).await)?;
        stage.advance(ProvisionStage::Mutated)?;

        if let Err(e) = self.catalog.delete_table(table.id).await {
            tracing::error!(
                table_id = %table.id,
                table = %table.name,
                error = %e,
                "backend object dropped but catalog delete failed; catalog row is dangling"
            );
            return stage.check(Err(e));
        }
        stage.advance(ProvisionStage::CatalogWritten)?;

        tracing::info!(database_id = %database.id, table_id = %table.id, table = %table.name, "table dropped");
        self.notify(CatalogEvent::TableDropped {
            database_id: database.id,
            table_id: table.id,
            name: table.name.clone(),
        });
        Ok(())
    }

    /// Drop every table at the backend in catalog order, then remove the database row.
    /// Stops at the first failed drop; tables already dropped stay dropped.
    pub async fn delete_database(&self, owner: Option<&str>, database_id: Uuid) -> Result<(), AppError> {
        let owner = require_owner(owner)?;
        let database = self.find_owned_database(owner, database_id).await?;
        for table in self.catalog.list_tables(database.id).await? {
            self.drop_entry(&database, &table).await?;
        }
        self.catalog.delete_database(database.id).await?;
        tracing::info!(database_id = %database.id, "database deleted");
        self.notify(CatalogEvent::DatabaseDeleted { database_id: database.id });
        Ok(())
    }

    /// Publish the five descriptors again. Appends; existing descriptors are kept.
    pub async fn generate_apis(&self, owner: Option<&str>, table_id: Uuid) -> Result<Vec<ApiDescriptor>, AppError> {
        let owner = require_owner(owner)?;
        let entry = self.find_owned_table(owner, table_id).await?;
        apis::publish(self.catalog.as_ref(), entry.table.id, &entry.table.name).await
    }
}

fn object_noun(database: &DatabaseRecord) -> &'static str {
    match database.kind {
        crate::model::BackendKind::Relational => "table",
        crate::model::BackendKind::Document => "collection",
    }
}

pub(crate) fn unexpected(step: &str, outcome: &OperationOutcome) -> AppError {
    AppError::Provision(format!("unexpected backend result for {}: {:?}", step, outcome))
}
