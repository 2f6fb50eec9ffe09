//! MySQL-family connector over a single sqlx connection per call.

use super::{unsupported, BackendOperation, Connector, OperationOutcome, RowOperation};
use crate::error::AppError;
use crate::model::{Credential, RelationalCredential};
use crate::sql::{self, MySqlBindValue, QueryBuf};
use crate::translator::{CreateInstruction, DropInstruction, ExistenceCheck};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::{ConnectOptions, Connection};

const ER_TABLE_EXISTS: u16 = 1050;
const ER_DUP_ENTRY: u16 = 1062;

#[derive(Clone, Copy, Debug, Default)]
pub struct RelationalConnector;

async fn connect(c: &RelationalCredential) -> Result<MySqlConnection, AppError> {
    MySqlConnectOptions::new()
        .host(&c.host)
        .port(c.port)
        .username(&c.user)
        .password(&c.password)
        .database(&c.database)
        .connect()
        .await
        .map_err(|e| AppError::Connection(e.to_string()))
}

/// Errors after the connection is open: transport problems stay `Connection`, the rest are the
/// server refusing the statement.
fn classify(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) => {
            let number = db.try_downcast_ref::<MySqlDatabaseError>().map(|e| e.number());
            match number {
                Some(ER_TABLE_EXISTS) | Some(ER_DUP_ENTRY) => AppError::Conflict(db.message().to_string()),
                _ => AppError::Provision(db.message().to_string()),
            }
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) | sqlx::Error::PoolTimedOut => {
            AppError::Connection(err.to_string())
        }
        _ => AppError::Provision(err.to_string()),
    }
}

async fn run(conn: &mut MySqlConnection, operation: BackendOperation) -> Result<OperationOutcome, AppError> {
    match operation {
        BackendOperation::CheckExists(ExistenceCheck::Sql { sql, params }) => {
            let mut q = sqlx::query_scalar::<_, i64>(&sql);
            for p in params {
                q = q.bind(p);
            }
            let count = q.fetch_one(&mut *conn).await.map_err(classify)?;
            Ok(OperationOutcome::Exists(count > 0))
        }
        BackendOperation::Create(CreateInstruction::Ddl(ddl)) | BackendOperation::Drop(DropInstruction::Ddl(ddl)) => {
            tracing::debug!(sql = %ddl, "ddl");
            execute_raw(&mut *conn, &ddl).await.map_err(classify)?;
            Ok(OperationOutcome::Applied)
        }
        BackendOperation::Rows(op) => run_rows(conn, op).await,
        other => Err(unsupported("relational", &other)),
    }
}

fn execute_raw<'a>(
    conn: &'a mut MySqlConnection,
    sql: &'a str,
) -> BoxFuture<'a, Result<sqlx::mysql::MySqlQueryResult, sqlx::Error>> {
    sqlx::Executor::execute(conn, sqlx::raw_sql(sql))
}

async fn run_rows(conn: &mut MySqlConnection, op: RowOperation) -> Result<OperationOutcome, AppError> {
    match op {
        RowOperation::List { table } => {
            let q = sql::select_all(&table)?;
            Ok(OperationOutcome::Rows(query_many(conn, &q).await?))
        }
        RowOperation::Get { table, key, id } => {
            let q = sql::select_by_key(&table, &key, &id)?;
            Ok(OperationOutcome::Row(query_many(conn, &q).await?.into_iter().next()))
        }
        RowOperation::Insert { table, row } => {
            let q = sql::insert(&table, &row)?;
            let result = execute(conn, &q).await?;
            Ok(OperationOutcome::Written(serde_json::json!({
                "affectedRows": result.rows_affected(),
                "insertId": result.last_insert_id(),
            })))
        }
        RowOperation::Update { table, key, id, row } => {
            let q = sql::update(&table, &key, &id, &row)?;
            let result = execute(conn, &q).await?;
            Ok(OperationOutcome::Written(serde_json::json!({ "affectedRows": result.rows_affected() })))
        }
        RowOperation::Delete { table, key, id } => {
            let q = sql::delete(&table, &key, &id)?;
            let result = execute(conn, &q).await?;
            Ok(OperationOutcome::Written(serde_json::json!({ "affectedRows": result.rows_affected() })))
        }
    }
}

async fn query_many(conn: &mut MySqlConnection, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(MySqlBindValue::from_json(p));
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(classify)?;
    Ok(rows.iter().map(row_to_json).collect())
}

async fn execute(conn: &mut MySqlConnection, q: &QueryBuf) -> Result<sqlx::mysql::MySqlQueryResult, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(MySqlBindValue::from_json(p));
    }
    query.execute(&mut *conn).await.map_err(classify)
}

#[async_trait]
impl Connector for RelationalConnector {
    async fn probe(&self, credential: &Credential) -> Result<bool, AppError> {
        let Credential::Relational(c) = credential else {
            return Ok(false);
        };
        let conn = connect(c).await?;
        conn.close().await.map_err(|e| AppError::Connection(e.to_string()))?;
        Ok(true)
    }

    async fn execute(&self, credential: &Credential, operation: BackendOperation) -> Result<OperationOutcome, AppError> {
        let Credential::Relational(c) = credential else {
            return Err(unsupported("relational", &operation));
        };
        let mut conn = connect(c).await?;
        let result = run(&mut conn, operation).await;
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "closing relational connection");
        }
        result
    }
}

fn row_to_json(row: &MySqlRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, col.ordinal()));
    }
    Value::Object(map)
}

fn cell_to_value(row: &MySqlRow, idx: usize) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<u64>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(idx) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(idx) {
        return j;
    }
    // DECIMAL and other textual encodings
    if let Ok(Some(s)) = row.try_get_unchecked::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    Value::Null
}
