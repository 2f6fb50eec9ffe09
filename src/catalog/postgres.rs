//! PostgreSQL catalog. All `_sys_*` tables live in one schema (`CATALOG_SCHEMA`, default `provisioner`).

use super::codec::{decode_credentials, encode_credentials};
use super::CatalogStore;
use crate::error::AppError;
use crate::model::{
    validate_identifier, ApiDescriptor, BackendKind, ColumnSpec, DatabaseRecord, HttpMethod, NewApiDescriptor,
    NewDatabase, TableEntry, TableRecord, TableSpec,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{ConnectOptions, PgPool, Row};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

const DATABASES: &str = "_sys_databases";
const TABLES: &str = "_sys_tables";
const COLUMNS: &str = "_sys_columns";
const APIS: &str = "_sys_apis";

#[derive(Clone, Debug)]
pub struct PgCatalogStore {
    pool: PgPool,
    schema: String,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Result<Self, AppError> {
        let schema = schema.into();
        validate_identifier("schema", &schema)?;
        Ok(Self { pool, schema })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Schema-qualified name of a `_sys_*` table (e.g. "provisioner._sys_tables").
    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", self.schema, table)
    }

    /// Create the schema and `_sys_*` tables if missing. Foreign keys cascade
    /// database → tables → columns/apis.
    pub async fn ensure_catalog_tables(&self) -> Result<(), AppError> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema))
            .execute(&self.pool)
            .await?;

        let q_databases = self.qualified(DATABASES);
        let q_tables = self.qualified(TABLES);
        let ddl = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    owner_id TEXT NOT NULL,
                    name TEXT,
                    kind TEXT NOT NULL,
                    credentials JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                q_databases
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    database_id UUID NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                q_tables, q_databases
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    table_id UUID NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    data_type TEXT NOT NULL,
                    is_primary_key BOOLEAN NOT NULL DEFAULT FALSE,
                    is_unique BOOLEAN NOT NULL DEFAULT FALSE,
                    is_required BOOLEAN NOT NULL DEFAULT FALSE,
                    PRIMARY KEY (table_id, position)
                )
                "#,
                self.qualified(COLUMNS),
                q_tables
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    table_id UUID NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    route TEXT NOT NULL,
                    method TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                self.qualified(APIS),
                q_tables
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS _sys_databases_owner_idx ON {} (owner_id)",
                q_databases
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS _sys_tables_database_idx ON {} (database_id)",
                q_tables
            ),
        ];
        for stmt in &ddl {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        tracing::debug!(schema = %self.schema, "catalog tables ready");
        Ok(())
    }

    fn database_from_row(row: &PgRow) -> Result<DatabaseRecord, AppError> {
        let kind: String = row.try_get("kind")?;
        let credentials: serde_json::Value = row.try_get("credentials")?;
        Ok(DatabaseRecord {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            name: row.try_get("name")?,
            kind: BackendKind::from_str(&kind)?,
            credentials: decode_credentials(credentials)?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Attach columns and descriptors to bare table rows, keeping the input order.
    async fn load_children(&self, rows: Vec<(Uuid, Uuid, String, DateTime<Utc>)>) -> Result<Vec<TableRecord>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.0).collect();

        let column_rows = sqlx::query(&format!(
            "SELECT table_id, name, data_type, is_primary_key, is_unique, is_required FROM {} WHERE table_id = ANY($1) ORDER BY table_id, position",
            self.qualified(COLUMNS)
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let mut columns: HashMap<Uuid, Vec<ColumnSpec>> = HashMap::new();
        for r in &column_rows {
            let table_id: Uuid = r.try_get("table_id")?;
            columns.entry(table_id).or_default().push(ColumnSpec {
                name: r.try_get("name")?,
                data_type: r.try_get("data_type")?,
                is_primary_key: r.try_get("is_primary_key")?,
                is_unique: r.try_get("is_unique")?,
                is_required: r.try_get("is_required")?,
            });
        }

        let api_rows = sqlx::query(&format!(
            "SELECT id, table_id, name, route, method FROM {} WHERE table_id = ANY($1) ORDER BY created_at, id",
            self.qualified(APIS)
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let mut apis: HashMap<Uuid, Vec<ApiDescriptor>> = HashMap::new();
        for r in &api_rows {
            let api = api_from_row(r)?;
            apis.entry(api.table_id).or_default().push(api);
        }

        Ok(rows
            .into_iter()
            .map(|(id, database_id, name, created_at)| TableRecord {
                id,
                database_id,
                name,
                columns: columns.remove(&id).unwrap_or_default(),
                apis: apis.remove(&id).unwrap_or_default(),
                created_at,
            })
            .collect())
    }
}

fn api_from_row(r: &PgRow) -> Result<ApiDescriptor, AppError> {
    let method: String = r.try_get("method")?;
    Ok(ApiDescriptor {
        id: r.try_get("id")?,
        table_id: r.try_get("table_id")?,
        name: r.try_get("name")?,
        route: r.try_get("route")?,
        method: HttpMethod::from_str(&method)?,
    })
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn create_database(&self, new: NewDatabase) -> Result<DatabaseRecord, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (id, owner_id, name, kind, credentials) VALUES ($1, $2, $3, $4, $5) RETURNING id, owner_id, name, kind, credentials, created_at",
            self.qualified(DATABASES)
        ))
        .bind(Uuid::new_v4())
        .bind(&new.owner_id)
        .bind(&new.name)
        .bind(new.kind.as_str())
        .bind(encode_credentials(&new.credentials)?)
        .fetch_one(&self.pool)
        .await?;
        Self::database_from_row(&row)
    }

    async fn find_database(&self, id: Uuid, owner_id: &str) -> Result<Option<DatabaseRecord>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT id, owner_id, name, kind, credentials, created_at FROM {} WHERE id = $1 AND owner_id = $2",
            self.qualified(DATABASES)
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::database_from_row).transpose()
    }

    async fn list_databases(&self, owner_id: &str) -> Result<Vec<DatabaseRecord>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT id, owner_id, name, kind, credentials, created_at FROM {} WHERE owner_id = $1 ORDER BY created_at, id",
            self.qualified(DATABASES)
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::database_from_row).collect()
    }

    async fn delete_database(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.qualified(DATABASES)))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("database {}", id)));
        }
        Ok(())
    }

    async fn create_table(&self, spec: TableSpec) -> Result<TableRecord, AppError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        let created_at: DateTime<Utc> = sqlx::query_scalar(&format!(
            "INSERT INTO {} (id, database_id, name) VALUES ($1, $2, $3) RETURNING created_at",
            self.qualified(TABLES)
        ))
        .bind(id)
        .bind(spec.database_id)
        .bind(&spec.name)
        .fetch_one(&mut *tx)
        .await?;

        let insert_column = format!(
            "INSERT INTO {} (table_id, position, name, data_type, is_primary_key, is_unique, is_required) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.qualified(COLUMNS)
        );
        for (position, c) in spec.columns.iter().enumerate() {
            sqlx::query(&insert_column)
                .bind(id)
                .bind(position as i32)
                .bind(&c.name)
                .bind(&c.data_type)
                .bind(c.is_primary_key)
                .bind(c.is_unique)
                .bind(c.is_required)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(TableRecord {
            id,
            database_id: spec.database_id,
            name: spec.name,
            columns: spec.columns,
            apis: Vec::new(),
            created_at,
        })
    }

    async fn find_table(&self, id: Uuid) -> Result<Option<TableEntry>, AppError> {
        let row: Option<(Uuid, Uuid, String, DateTime<Utc>)> = sqlx::query_as(&format!(
            "SELECT id, database_id, name, created_at FROM {} WHERE id = $1",
            self.qualified(TABLES)
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let database_id = row.1;

        let db_row = sqlx::query(&format!(
            "SELECT id, owner_id, name, kind, credentials, created_at FROM {} WHERE id = $1",
            self.qualified(DATABASES)
        ))
        .bind(database_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(db_row) = db_row else {
            return Ok(None);
        };
        let database = Self::database_from_row(&db_row)?;

        let table = self.load_children(vec![row]).await?.into_iter().next();
        Ok(table.map(|table| TableEntry { table, database }))
    }

    async fn list_tables(&self, database_id: Uuid) -> Result<Vec<TableRecord>, AppError> {
        let rows: Vec<(Uuid, Uuid, String, DateTime<Utc>)> = sqlx::query_as(&format!(
            "SELECT id, database_id, name, created_at FROM {} WHERE database_id = $1 ORDER BY created_at, id",
            self.qualified(TABLES)
        ))
        .bind(database_id)
        .fetch_all(&self.pool)
        .await?;
        self.load_children(rows).await
    }

    async fn delete_table(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.qualified(TABLES)))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("table {}", id)));
        }
        Ok(())
    }

    async fn create_api_descriptor(&self, new: NewApiDescriptor) -> Result<ApiDescriptor, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (id, table_id, name, route, method) VALUES ($1, $2, $3, $4, $5) RETURNING id, table_id, name, route, method",
            self.qualified(APIS)
        ))
        .bind(Uuid::new_v4())
        .bind(new.table_id)
        .bind(&new.name)
        .bind(&new.route)
        .bind(new.method.as_str())
        .fetch_one(&self.pool)
        .await?;
        api_from_row(&row)
    }
}

/// Ensure the database named in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating catalog database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url.rfind('/').ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
