//! Router construction

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::web::{
    handlers::forward,
    middleware::{asset_middleware, response_headers_middleware},
    types::AppState,
};

/// Every request is forwarded; responses pass the rewriting middleware on
/// their way out.
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .fallback(forward)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state.clone(), asset_middleware))
        .layer(middleware::from_fn_with_state(state, response_headers_middleware))
        .layer(TraceLayer::new_for_http())
}
