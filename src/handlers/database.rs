//! Database registration, listing, deletion and connection tests.

use super::parse_uuid;
use crate::error::AppError;
use crate::extractors::OwnerId;
use crate::model::Credential;
use crate::response::{created, listed, ok};
use crate::service::RegisterDatabase;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ConnectionCheck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(body): Json<RegisterDatabase>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.provisioner.register_credentials(owner.as_deref(), body).await?;
    Ok(created(record))
}

/// Always 200: a failed probe is reported in the body with the driver's message.
pub async fn test_connection(
    State(state): State<AppState>,
    Json(credential): Json<Credential>,
) -> impl IntoResponse {
    let check = match state.provisioner.test_connection(&credential).await {
        Ok(true) => ConnectionCheck { ok: true, message: None },
        Ok(false) => ConnectionCheck {
            ok: false,
            message: Some(format!("no connector for {} backends", credential.kind())),
        },
        Err(e) => {
            tracing::debug!(kind = %credential.kind(), error = %e, "connection test failed");
            ConnectionCheck {
                ok: false,
                message: Some(e.to_string()),
            }
        }
    };
    (StatusCode::OK, Json(check))
}

pub async fn list(State(state): State<AppState>, owner: OwnerId) -> Result<impl IntoResponse, AppError> {
    let records = state.provisioner.list_databases(owner.as_deref()).await?;
    Ok(listed(records))
}

pub async fn read(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid("database", &id)?;
    let record = state.provisioner.get_database(owner.as_deref(), id).await?;
    Ok(ok(record))
}

pub async fn delete(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid("database", &id)?;
    state.provisioner.delete_database(owner.as_deref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
