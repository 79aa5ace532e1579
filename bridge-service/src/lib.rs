//! Privileged host process of the SQL Server management bridge.
//!
//! Owns every database connection, the credential and session files, and all
//! SQL execution. The sandboxed UI process invokes the operations exposed by
//! [`routes::router`] over loopback HTTP and receives uniform envelopes.

pub mod csv;
pub mod handlers;
pub mod registry;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod stores;
pub mod tds;

use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use common::middleware::request_id::request_id_middleware;
use state::AppState;

/// Builds the full application router with middleware applied.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(routes::openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
