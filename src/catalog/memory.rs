//! In-process catalog over plain maps. Same contract as the PostgreSQL store, nothing survives a restart.

use super::CatalogStore;
use crate::error::AppError;
use crate::model::{ApiDescriptor, DatabaseRecord, NewApiDescriptor, NewDatabase, TableEntry, TableRecord, TableSpec};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    databases: HashMap<Uuid, DatabaseRecord>,
    /// Creation order is the listing order.
    tables: Vec<TableRecord>,
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    inner: RwLock<Inner>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_database(&self, new: NewDatabase) -> Result<DatabaseRecord, AppError> {
        let record = DatabaseRecord {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: new.name,
            kind: new.kind,
            credentials: new.credentials,
            created_at: Utc::now(),
        };
        self.inner.write().await.databases.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_database(&self, id: Uuid, owner_id: &str) -> Result<Option<DatabaseRecord>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.databases.get(&id).filter(|d| d.owner_id == owner_id).cloned())
    }

    async fn list_databases(&self, owner_id: &str) -> Result<Vec<DatabaseRecord>, AppError> {
        let inner = self.inner.read().await;
        let mut out: Vec<DatabaseRecord> = inner
            .databases
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn delete_database(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if inner.databases.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("database {}", id)));
        }
        inner.tables.retain(|t| t.database_id != id);
        Ok(())
    }

    async fn create_table(&self, spec: TableSpec) -> Result<TableRecord, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.databases.contains_key(&spec.database_id) {
            return Err(AppError::NotFound(format!("database {}", spec.database_id)));
        }
        let record = TableRecord {
            id: Uuid::new_v4(),
            database_id: spec.database_id,
            name: spec.name,
            columns: spec.columns,
            apis: Vec::new(),
            created_at: Utc::now(),
        };
        inner.tables.push(record.clone());
        Ok(record)
    }

    async fn find_table(&self, id: Uuid) -> Result<Option<TableEntry>, AppError> {
        let inner = self.inner.read().await;
        let Some(table) = inner.tables.iter().find(|t| t.id == id) else {
            return Ok(None);
        };
        Ok(inner.databases.get(&table.database_id).map(|database| TableEntry {
            table: table.clone(),
            database: database.clone(),
        }))
    }

    async fn list_tables(&self, database_id: Uuid) -> Result<Vec<TableRecord>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.tables.iter().filter(|t| t.database_id == database_id).cloned().collect())
    }

    async fn delete_table(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let before = inner.tables.len();
        inner.tables.retain(|t| t.id != id);
        if inner.tables.len() == before {
            return Err(AppError::NotFound(format!("table {}", id)));
        }
        Ok(())
    }

    async fn create_api_descriptor(&self, new: NewApiDescriptor) -> Result<ApiDescriptor, AppError> {
        let mut inner = self.inner.write().await;
        let table = inner
            .tables
            .iter_mut()
            .find(|t| t.id == new.table_id)
            .ok_or_else(|| AppError::NotFound(format!("table {}", new.table_id)))?;
        let api = ApiDescriptor {
            id: Uuid::new_v4(),
            table_id: new.table_id,
            name: new.name,
            route: new.route,
            method: new.method,
        };
        table.apis.push(api.clone());
        Ok(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackendKind, ColumnSpec, HttpMethod};
    use crate::vault::EncryptedBlob;

    fn new_db(owner: &str) -> NewDatabase {
        NewDatabase {
            owner_id: owner.into(),
            name: None,
            kind: BackendKind::Relational,
            credentials: EncryptedBlob { iv: "00".repeat(16), cipher_text: "ab".into() },
        }
    }

    fn spec(database_id: Uuid, name: &str) -> TableSpec {
        TableSpec {
            name: name.into(),
            database_id,
            columns: vec![ColumnSpec {
                name: "id".into(),
                data_type: "INT".into(),
                is_primary_key: true,
                is_unique: false,
                is_required: true,
            }],
        }
    }

    #[tokio::test]
    async fn databases_are_scoped_to_owner() {
        let store = MemoryCatalogStore::new();
        let db = store.create_database(new_db("alice")).await.unwrap();
        assert!(store.find_database(db.id, "alice").await.unwrap().is_some());
        assert!(store.find_database(db.id, "bob").await.unwrap().is_none());
        assert_eq!(store.list_databases("bob").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn deleting_table_removes_descriptors() {
        let store = MemoryCatalogStore::new();
        let db = store.create_database(new_db("alice")).await.unwrap();
        let t = store.create_table(spec(db.id, "users")).await.unwrap();
        store
            .create_api_descriptor(NewApiDescriptor {
                table_id: t.id,
                name: "Get all users".into(),
                route: format!("/api/tables/{}/data", t.id),
                method: HttpMethod::Get,
            })
            .await
            .unwrap();
        let entry = store.find_table(t.id).await.unwrap().unwrap();
        assert_eq!(entry.table.apis.len(), 1);
        assert_eq!(entry.database.id, db.id);

        store.delete_table(t.id).await.unwrap();
        assert!(store.find_table(t.id).await.unwrap().is_none());
        assert!(matches!(store.delete_table(t.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleting_database_cascades_to_tables() {
        let store = MemoryCatalogStore::new();
        let db = store.create_database(new_db("alice")).await.unwrap();
        let a = store.create_table(spec(db.id, "a")).await.unwrap();
        let b = store.create_table(spec(db.id, "b")).await.unwrap();
        let names: Vec<String> = store.list_tables(db.id).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        store.delete_database(db.id).await.unwrap();
        assert!(store.find_table(a.id).await.unwrap().is_none());
        assert!(store.find_table(b.id).await.unwrap().is_none());
    }
}
