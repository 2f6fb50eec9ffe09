#![allow(dead_code)]

use async_trait::async_trait;
use schema_provisioner::connector::{BackendOperation, Connector, OperationOutcome, RowOperation};
use schema_provisioner::model::{
    ApiDescriptor, ColumnSpec, Credential, DatabaseRecord, NewApiDescriptor, NewDatabase, TableEntry, TableRecord,
    TableSpec,
};
use schema_provisioner::service::{CreateTable, RegisterDatabase};
use schema_provisioner::translator::{CreateInstruction, DropInstruction, ExistenceCheck};
use schema_provisioner::{AppError, CatalogStore, EncryptionKey, MemoryCatalogStore, Provisioner, Vault};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const OWNER: &str = "owner-1";

/// Records every call and keeps backend objects and rows in memory.
#[derive(Default)]
pub struct FakeConnector {
    pub calls: Mutex<Vec<String>>,
    pub objects: Mutex<HashSet<String>>,
    pub rows: Mutex<HashMap<String, Vec<Value>>>,
    pub created: Mutex<Vec<CreateInstruction>>,
    unreachable: AtomicBool,
    kind_unhandled: AtomicBool,
    existence_hidden: AtomicBool,
}

impl FakeConnector {
    pub fn set_unreachable(&self, v: bool) {
        self.unreachable.store(v, Ordering::SeqCst);
    }

    /// Reachability answers `Ok(false)`, as when no connector handles the backend kind.
    pub fn set_kind_unhandled(&self, v: bool) {
        self.kind_unhandled.store(v, Ordering::SeqCst);
    }

    /// Existence checks answer "absent" even for objects that exist, as when another
    /// writer creates the object between the check and the create.
    pub fn set_existence_hidden(&self, v: bool) {
        self.existence_hidden.store(v, Ordering::SeqCst);
    }

    pub fn add_out_of_band(&self, name: &str) {
        self.objects.lock().unwrap().insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn mutations(&self) -> usize {
        ["create", "drop", "insert_row", "update_row", "delete_row"]
            .iter()
            .map(|n| self.count(n))
            .sum()
    }

    pub fn remove_out_of_band(&self, name: &str) {
        self.objects.lock().unwrap().remove(name);
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.objects.lock().unwrap().contains(name)
    }
}

fn ddl_name(ddl: &str, prefix: &str) -> String {
    ddl.trim_start_matches(prefix)
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap()
        .to_string()
}

#[async_trait]
impl Connector for FakeConnector {
    async fn probe(&self, _credential: &Credential) -> Result<bool, AppError> {
        self.calls.lock().unwrap().push("probe".into());
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AppError::Connection("connect ECONNREFUSED 127.0.0.1:3306".into()));
        }
        Ok(!self.kind_unhandled.load(Ordering::SeqCst))
    }

    async fn execute(&self, _credential: &Credential, operation: BackendOperation) -> Result<OperationOutcome, AppError> {
        self.calls.lock().unwrap().push(operation.name().into());
        match operation {
            BackendOperation::CheckExists(check) => {
                let name = match check {
                    ExistenceCheck::Sql { params, .. } => params[0].clone(),
                    ExistenceCheck::Collection { name } => name,
                };
                let hidden = self.existence_hidden.load(Ordering::SeqCst);
                Ok(OperationOutcome::Exists(!hidden && self.has_object(&name)))
            }
            BackendOperation::Create(instruction) => {
                let name = match &instruction {
                    CreateInstruction::Ddl(ddl) => ddl_name(ddl, "CREATE TABLE "),
                    CreateInstruction::Collection { name, .. } => name.clone(),
                };
                if !self.objects.lock().unwrap().insert(name.clone()) {
                    return Err(AppError::Conflict(format!("Table '{}' already exists", name)));
                }
                self.created.lock().unwrap().push(instruction);
                Ok(OperationOutcome::Applied)
            }
            BackendOperation::Drop(instruction) => {
                let name = match instruction {
                    DropInstruction::Ddl(ddl) => ddl_name(&ddl, "DROP TABLE "),
                    DropInstruction::Collection { name } => name,
                };
                if !self.objects.lock().unwrap().remove(&name) {
                    return Err(AppError::Provision(format!("Unknown table '{}'", name)));
                }
                Ok(OperationOutcome::Applied)
            }
            BackendOperation::Rows(op) => {
                let mut rows = self.rows.lock().unwrap();
                match op {
                    RowOperation::List { table } => Ok(OperationOutcome::Rows(rows.get(&table).cloned().unwrap_or_default())),
                    RowOperation::Get { table, key, id } => Ok(OperationOutcome::Row(
                        rows.get(&table).and_then(|r| r.iter().find(|row| row[&key] == id).cloned()),
                    )),
                    RowOperation::Insert { table, row } => {
                        rows.entry(table).or_default().push(Value::Object(row));
                        Ok(OperationOutcome::Written(json!({ "affectedRows": 1 })))
                    }
                    RowOperation::Update { table, key, id, row } => {
                        let mut n = 0;
                        for r in rows.entry(table).or_default().iter_mut().filter(|r| r[&key] == id) {
                            for (k, v) in &row {
                                r[k] = v.clone();
                            }
                            n += 1;
                        }
                        Ok(OperationOutcome::Written(json!({ "affectedRows": n })))
                    }
                    RowOperation::Delete { table, key, id } => {
                        let list = rows.entry(table).or_default();
                        let before = list.len();
                        list.retain(|r| r[&key] != id);
                        Ok(OperationOutcome::Written(json!({ "affectedRows": before - list.len() })))
                    }
                }
            }
        }
    }
}

/// In-memory catalog whose table writes, table deletes and descriptor writes can be made to fail.
#[derive(Default)]
pub struct FlakyCatalog {
    inner: MemoryCatalogStore,
    fail_create_table: AtomicBool,
    fail_delete_table: AtomicBool,
    fail_descriptors: AtomicBool,
}

impl FlakyCatalog {
    pub fn fail_create_table(&self, v: bool) {
        self.fail_create_table.store(v, Ordering::SeqCst);
    }

    pub fn fail_delete_table(&self, v: bool) {
        self.fail_delete_table.store(v, Ordering::SeqCst);
    }

    pub fn fail_descriptors(&self, v: bool) {
        self.fail_descriptors.store(v, Ordering::SeqCst);
    }
}

fn catalog_down(flag: &AtomicBool) -> Result<(), AppError> {
    if flag.load(Ordering::SeqCst) {
        return Err(AppError::Catalog(sqlx::Error::PoolTimedOut));
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for FlakyCatalog {
    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }

    async fn create_database(&self, new: NewDatabase) -> Result<DatabaseRecord, AppError> {
        self.inner.create_database(new).await
    }

    async fn find_database(&self, id: Uuid, owner_id: &str) -> Result<Option<DatabaseRecord>, AppError> {
        self.inner.find_database(id, owner_id).await
    }

    async fn list_databases(&self, owner_id: &str) -> Result<Vec<DatabaseRecord>, AppError> {
        self.inner.list_databases(owner_id).await
    }

    async fn delete_database(&self, id: Uuid) -> Result<(), AppError> {
        self.inner.delete_database(id).await
    }

    async fn create_table(&self, spec: TableSpec) -> Result<TableRecord, AppError> {
        catalog_down(&self.fail_create_table)?;
        self.inner.create_table(spec).await
    }

    async fn find_table(&self, id: Uuid) -> Result<Option<TableEntry>, AppError> {
        self.inner.find_table(id).await
    }

    async fn list_tables(&self, database_id: Uuid) -> Result<Vec<TableRecord>, AppError> {
        self.inner.list_tables(database_id).await
    }

    async fn delete_table(&self, id: Uuid) -> Result<(), AppError> {
        catalog_down(&self.fail_delete_table)?;
        self.inner.delete_table(id).await
    }

    async fn create_api_descriptor(&self, new: NewApiDescriptor) -> Result<ApiDescriptor, AppError> {
        catalog_down(&self.fail_descriptors)?;
        self.inner.create_api_descriptor(new).await
    }
}

pub struct Fixture {
    pub provisioner: Provisioner,
    pub connector: Arc<FakeConnector>,
    pub catalog: Arc<FlakyCatalog>,
}

pub fn test_vault() -> Vault {
    Vault::new(EncryptionKey::from_bytes([7u8; 32]))
}

pub fn fixture() -> Fixture {
    let connector = Arc::new(FakeConnector::default());
    let catalog = Arc::new(FlakyCatalog::default());
    let provisioner = Provisioner::new(test_vault(), connector.clone(), catalog.clone());
    Fixture {
        provisioner,
        connector,
        catalog,
    }
}

pub fn relational_credential() -> Value {
    json!({
        "backendKind": "relational",
        "host": "localhost",
        "port": 3306,
        "database": "app",
        "user": "root",
        "password": "s3cret"
    })
}

pub fn document_credential() -> Value {
    json!({ "backendKind": "document", "uri": "mongodb://localhost:27017/test" })
}

pub fn register_request(credential: Value) -> RegisterDatabase {
    serde_json::from_value(credential).unwrap()
}

pub fn column(name: &str, data_type: &str, pk: bool, unique: bool, required: bool) -> ColumnSpec {
    ColumnSpec {
        name: name.into(),
        data_type: data_type.into(),
        is_primary_key: pk,
        is_unique: unique,
        is_required: required,
    }
}

pub fn users_table() -> CreateTable {
    CreateTable {
        name: "users".into(),
        columns: vec![
            column("id", "INT", true, true, true),
            column("email", "VARCHAR(255)", false, true, true),
            column("active", "BOOLEAN", false, false, false),
        ],
    }
}
