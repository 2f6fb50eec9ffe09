//! Row routes matching the generated descriptor paths (`/api/tables/:table_id/data[/:id]`).

use crate::handlers::data::{create, delete, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn data_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/tables/:table_id/data", get(list).post(create))
        .route("/api/tables/:table_id/data/:id", get(read).put(update).delete(delete))
        .with_state(state)
}
