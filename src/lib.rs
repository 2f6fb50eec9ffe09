//! Schema provisioner: stores encrypted connection credentials for relational and document stores,
//! creates and drops tables or collections from a backend-agnostic column model, and publishes
//! CRUD API descriptors per table.

pub mod catalog;
pub mod connector;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod translator;
pub mod vault;

pub use catalog::{ensure_database_exists, CatalogStore, MemoryCatalogStore, PgCatalogStore};
pub use connector::{BackendConnector, Connector};
pub use error::{AppError, ConfigError};
pub use response::Envelope;
pub use routes::{app, common_routes, data_routes, provision_routes, API_PREFIX};
pub use service::{CatalogEvent, Provisioner};
pub use settings::Settings;
pub use state::AppState;
pub use vault::{EncryptionKey, Vault};
