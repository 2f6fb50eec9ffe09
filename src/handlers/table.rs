//! Table provisioning: create, list, read, drop and descriptor regeneration.

use super::parse_uuid;
use crate::error::AppError;
use crate::extractors::OwnerId;
use crate::response::{created, listed, listed_created, ok};
use crate::service::CreateTable;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

pub async fn create(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(database_id): Path<String>,
    Json(body): Json<CreateTable>,
) -> Result<impl IntoResponse, AppError> {
    let database_id = parse_uuid("database", &database_id)?;
    let table = state.provisioner.create_table(owner.as_deref(), database_id, body).await?;
    Ok(created(table))
}

pub async fn list(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(database_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let database_id = parse_uuid("database", &database_id)?;
    let tables = state.provisioner.list_tables(owner.as_deref(), database_id).await?;
    Ok(listed(tables))
}

pub async fn read(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid("table", &id)?;
    let table = state.provisioner.get_table(owner.as_deref(), id).await?;
    Ok(ok(table))
}

pub async fn delete(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid("table", &id)?;
    state.provisioner.drop_table(owner.as_deref(), id).await?;
    Ok(ok(serde_json::json!({ "ok": true })))
}

pub async fn generate_apis(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid("table", &id)?;
    let apis = state.provisioner.generate_apis(owner.as_deref(), id).await?;
    Ok(listed_created(apis))
}
