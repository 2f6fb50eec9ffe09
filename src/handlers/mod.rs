//! HTTP handlers for credential registration, table provisioning and row pass-through.

pub mod data;
pub mod database;
pub mod table;

use crate::error::AppError;
use serde_json::{Map, Value};
use uuid::Uuid;

fn parse_uuid(kind: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("invalid {} id: {}", kind, raw)))
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}
