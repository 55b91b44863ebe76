//! HTTP route handlers for the share site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (pings the store)
//!
//! # Share links (JSON)
//! GET  /s/{code}                     - Shared customer view
//! POST /s/{code}/unlock              - Verify the link password
//! GET  /s/{code}/visits              - Completed visits, newest first
//! GET  /s/{code}/visits/{visit_id}   - One visit
//! ```
//!
//! Tenant-side customer and share management is a library surface
//! ([`crate::services`]) and has no routes here.

pub mod share;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::db::CustomerStore;
use crate::state::AppState;

/// Create the share link routes router.
pub fn share_routes<S: CustomerStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/{code}", get(share::show::<S>))
        .route("/{code}/unlock", post(share::unlock::<S>))
        .route("/{code}/visits", get(share::visits::<S>))
        .route("/{code}/visits/{visit_id}", get(share::visit::<S>))
}

/// Create all routes for the share site.
pub fn routes<S: CustomerStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S>))
        .nest("/s", share_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness<S: CustomerStore>(State(state): State<AppState<S>>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
