//! HTTP middleware stack for the share site.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. Request ID (add unique ID to each request)
//! 3. `TraceLayer` (request span with the route template, never the URI)
//! 4. Session layer (tower-sessions with an in-process store)
//! 5. Security headers (CSP, no-store, no-referrer)

pub mod request_id;
pub mod security_headers;
pub mod session;

pub use request_id::{request_id_middleware, request_span};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
