//! Row pass-through handlers addressed by the generated descriptors.

use super::{body_to_map, parse_uuid};
use crate::error::AppError;
use crate::extractors::OwnerId;
use crate::response::{created, listed, ok};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

pub async fn list(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(table_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let table_id = parse_uuid("table", &table_id)?;
    let rows = state.provisioner.list_rows(owner.as_deref(), table_id).await?;
    Ok(listed(rows))
}

pub async fn read(
    State(state): State<AppState>,
    owner: OwnerId,
    Path((table_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let table_id = parse_uuid("table", &table_id)?;
    let row = state.provisioner.get_row(owner.as_deref(), table_id, &id).await?;
    Ok(ok(row))
}

pub async fn create(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(table_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let table_id = parse_uuid("table", &table_id)?;
    let summary = state.provisioner.insert_row(owner.as_deref(), table_id, body_to_map(body)?).await?;
    Ok(created(summary))
}

pub async fn update(
    State(state): State<AppState>,
    owner: OwnerId,
    Path((table_id, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let table_id = parse_uuid("table", &table_id)?;
    let summary = state
        .provisioner
        .update_row(owner.as_deref(), table_id, &id, body_to_map(body)?)
        .await?;
    Ok(ok(summary))
}

pub async fn delete(
    State(state): State<AppState>,
    owner: OwnerId,
    Path((table_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let table_id = parse_uuid("table", &table_id)?;
    let summary = state.provisioner.delete_row(owner.as_deref(), table_id, &id).await?;
    Ok(ok(summary))
}
