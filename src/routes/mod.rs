//! Router assembly.

mod common;
mod data;
mod provision;

pub use common::common_routes;
pub use data::data_routes;
pub use provision::provision_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Prefix of the provisioning routes.
pub const API_PREFIX: &str = "/api/v1";

/// Full application: common routes, provisioning under [`API_PREFIX`], row routes at the descriptor paths.
pub fn app(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .nest(API_PREFIX, provision_routes(state.clone()))
        .merge(data_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
}
