//! Salon CRM share service library.
//!
//! Customer identity and secure sharing for the salon CRM: per-tenant
//! identifier allocation, write-time PII masking, share link management, and
//! the public read gateway behind share links.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, body::Body};
use tower_http::trace::TraceLayer;

use crate::db::CustomerStore;
use crate::state::AppState;

/// Build the share site router with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app<S: CustomerStore>(state: AppState<S>) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    routes::routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(middleware::request_span::<Body>))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .with_state(state)
}
