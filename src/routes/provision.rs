//! Provisioning routes: databases, tables and descriptor regeneration.

use crate::handlers::{database, table};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn provision_routes(state: AppState) -> Router {
    Router::new()
        .route("/databases", get(database::list).post(database::register))
        .route("/databases/test", post(database::test_connection))
        .route("/databases/:id", get(database::read).delete(database::delete))
        .route("/databases/:id/tables", get(table::list).post(table::create))
        .route("/tables/:id", get(table::read).delete(table::delete))
        .route("/tables/:id/apis", post(table::generate_apis))
        .with_state(state)
}
