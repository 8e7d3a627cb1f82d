pub mod middleware;
pub mod rest;
pub mod services;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_api_key;
pub use rest::{get_sensor_handler, list_sensors_handler, refresh_handler, status_handler};
pub use services::call_service_handler;
use state::AppState;

/// Builds the API router. Service routes sit behind the API key check.
pub fn router(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/sensors", get(list_sensors_handler))
        .route("/sensors/{id}", get(get_sensor_handler))
        .route("/status", get(status_handler));

    let protected_routes = Router::new()
        .route("/services/{name}", post(call_service_handler))
        .route("/refresh", post(refresh_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_api_key,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
