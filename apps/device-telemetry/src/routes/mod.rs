pub mod devices;
pub mod health;


use axum::middleware::from_fn;
use axum::Router;

use crate::request_context::attach_request_context;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(devices::router())
        .layer(from_fn(attach_request_context))
        .with_state(state)
}
