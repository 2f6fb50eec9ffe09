//! Backend-agnostic model: credentials, columns, tables and API descriptors.

use crate::error::AppError;
use crate::vault::EncryptedBlob;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Which family of data store a registered database belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[serde(alias = "mysql")]
    Relational,
    #[serde(alias = "mongodb")]
    Document,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Relational => "relational",
            BackendKind::Document => "document",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relational" | "mysql" => Ok(BackendKind::Relational),
            "document" | "mongodb" => Ok(BackendKind::Document),
            _ => Err(AppError::InvalidInput(format!(
                "unknown backend kind: {} (expected relational or document)",
                s
            ))),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalCredential {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for RelationalCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalCredential")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCredential {
    #[serde(alias = "mongoUri")]
    pub uri: String,
}

/// Connection parameters; the variant decides which field set exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backendKind", rename_all = "lowercase")]
pub enum Credential {
    #[serde(alias = "mysql")]
    Relational(RelationalCredential),
    #[serde(alias = "mongodb")]
    Document(DocumentCredential),
}

impl Credential {
    pub fn kind(&self) -> BackendKind {
        match self {
            Credential::Relational(_) => BackendKind::Relational,
            Credential::Document(_) => BackendKind::Document,
        }
    }

    /// Record that gets encrypted into the catalog. Document credentials keep the `mongoUri` key
    /// so rows written by earlier deployments stay readable.
    pub fn to_payload(&self) -> Value {
        match self {
            Credential::Relational(c) => serde_json::json!({
                "host": c.host,
                "port": c.port,
                "database": c.database,
                "user": c.user,
                "password": c.password,
            }),
            Credential::Document(c) => serde_json::json!({ "mongoUri": c.uri }),
        }
    }

    /// Rebuild a credential from a decrypted record for the given kind.
    pub fn from_payload(kind: BackendKind, record: Map<String, Value>) -> Result<Self, AppError> {
        let mut record = record;
        if kind == BackendKind::Relational {
            // Older rows stored the port as a string.
            if let Some(Value::String(p)) = record.get("port") {
                let port: u16 = p
                    .parse()
                    .map_err(|_| AppError::Vault(format!("stored port is not a number: {}", p)))?;
                record.insert("port".into(), Value::from(port));
            }
        }
        let value = Value::Object(record);
        let credential = match kind {
            BackendKind::Relational => serde_json::from_value(value).map(Credential::Relational),
            BackendKind::Document => serde_json::from_value(value).map(Credential::Document),
        };
        credential.map_err(|e| AppError::Vault(format!("stored {} credential is malformed: {}", kind, e)))
    }
}

/// One field of a table or collection, independent of the target engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_required: bool,
}

/// A create-table request after the database reference has been resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub database_id: Uuid,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(AppError::InvalidInput(format!("unsupported method: {}", s))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDescriptor {
    pub id: Uuid,
    pub table_id: Uuid,
    pub name: String,
    pub route: String,
    pub method: HttpMethod,
}

/// Descriptor fields before the catalog assigns an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewApiDescriptor {
    pub table_id: Uuid,
    pub name: String,
    pub route: String,
    pub method: HttpMethod,
}

/// Registered data store. Credentials stay encrypted and are never serialized outward.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseRecord {
    pub id: Uuid,
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: BackendKind,
    #[serde(skip_serializing)]
    pub credentials: EncryptedBlob,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewDatabase {
    pub owner_id: String,
    pub name: Option<String>,
    pub kind: BackendKind,
    pub credentials: EncryptedBlob,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub id: Uuid,
    pub database_id: Uuid,
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub apis: Vec<ApiDescriptor>,
    pub created_at: DateTime<Utc>,
}

impl TableRecord {
    pub fn primary_key(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.is_primary_key)
    }
}

/// Table row joined with the database that owns it.
#[derive(Clone, Debug)]
pub struct TableEntry {
    pub table: TableRecord,
    pub database: DatabaseRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_deserializes_from_tagged_request() {
        let c: Credential = serde_json::from_value(serde_json::json!({
            "backendKind": "document",
            "uri": "mongodb://localhost:27017/test"
        }))
        .unwrap();
        assert_eq!(c.kind(), BackendKind::Document);

        let legacy: Credential = serde_json::from_value(serde_json::json!({
            "backendKind": "mysql",
            "host": "db", "port": 3306, "database": "app", "user": "root", "password": "pw"
        }))
        .unwrap();
        assert_eq!(legacy.kind(), BackendKind::Relational);
    }

    #[test]
    fn document_payload_keeps_mongo_uri_key() {
        let c = Credential::Document(DocumentCredential { uri: "mongodb://h/db".into() });
        let payload = c.to_payload();
        assert_eq!(payload["mongoUri"], "mongodb://h/db");
        let back = Credential::from_payload(BackendKind::Document, payload.as_object().unwrap().clone()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn relational_payload_accepts_string_port() {
        let record = serde_json::json!({
            "host": "db", "port": "3307", "database": "app", "user": "u", "password": "p"
        });
        let c = Credential::from_payload(BackendKind::Relational, record.as_object().unwrap().clone()).unwrap();
        match c {
            Credential::Relational(r) => assert_eq!(r.port, 3307),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn relational_debug_redacts_password() {
        let c = RelationalCredential {
            host: "db".into(),
            port: 3306,
            database: "app".into(),
            user: "u".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{:?}", c);
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn column_spec_uses_camel_case_keys() {
        let col: ColumnSpec = serde_json::from_value(serde_json::json!({
            "name": "id", "dataType": "INT", "isPrimaryKey": true
        }))
        .unwrap();
        assert!(col.is_primary_key);
        assert!(!col.is_required);
    }
}
