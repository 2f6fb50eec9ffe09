//! Catalog store: durable bookkeeping of registered databases, tables, columns and API descriptors.
//!
//! Deleting a database removes its tables; deleting a table removes its columns and descriptors.
//! The store never talks to the target backends.

mod codec;
mod memory;
mod postgres;

pub use codec::{decode_credentials, encode_credentials};
pub use memory::MemoryCatalogStore;
pub use postgres::{ensure_database_exists, PgCatalogStore};

use crate::error::AppError;
use crate::model::{ApiDescriptor, DatabaseRecord, NewApiDescriptor, NewDatabase, TableEntry, TableRecord, TableSpec};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Cheap reachability check used by the readiness route.
    async fn ping(&self) -> Result<(), AppError>;

    async fn create_database(&self, new: NewDatabase) -> Result<DatabaseRecord, AppError>;

    /// Only returns the database when it belongs to `owner_id`.
    async fn find_database(&self, id: Uuid, owner_id: &str) -> Result<Option<DatabaseRecord>, AppError>;

    async fn list_databases(&self, owner_id: &str) -> Result<Vec<DatabaseRecord>, AppError>;

    async fn delete_database(&self, id: Uuid) -> Result<(), AppError>;

    /// Writes the table and all of its columns atomically. Column order is preserved.
    async fn create_table(&self, spec: TableSpec) -> Result<TableRecord, AppError>;

    /// Table with columns and descriptors, joined with its owning database.
    async fn find_table(&self, id: Uuid) -> Result<Option<TableEntry>, AppError>;

    /// Tables of one database in creation order.
    async fn list_tables(&self, database_id: Uuid) -> Result<Vec<TableRecord>, AppError>;

    async fn delete_table(&self, id: Uuid) -> Result<(), AppError>;

    async fn create_api_descriptor(&self, new: NewApiDescriptor) -> Result<ApiDescriptor, AppError>;
}
