use axum::{routing::get, Router};
use axum_helpers::server::{create_router, health_router};
use std::io;

use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod health;
pub mod products;

/// Creates the API routes without the prefix.
/// The prefix is added by the `create_router` helper.
pub fn routes(state: &AppState) -> Router {
    Router::new().nest("/products", products::router(state))
}

/// Creates a router with the /ready endpoint that performs actual health checks.
pub fn ready_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

/// Full application: prefixed API, docs, middleware, `/health` and `/ready`.
pub fn app(state: &AppState) -> io::Result<Router> {
    let router = create_router::<ApiDoc>(&state.config.api_prefix, &state.config.server, routes(state))?;

    Ok(router
        .merge(health_router(state.config.app))
        .merge(ready_router(state.clone())))
}
