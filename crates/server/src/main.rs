//! Salon CRM share service.
//!
//! This binary serves public share links on port 3002.
//!
//! Run `salon-crm-share migrate` to apply database migrations and exit.
//!
//! # Architecture
//!
//! - Axum web framework, JSON responses only
//! - `PostgreSQL` customer store (in-memory store when no database is configured)
//! - Browser-session-scoped unlocks for password-protected links
//!
//! # Security
//!
//! This binary only exposes anonymous, token-scoped reads. Tenant-side
//! customer and share management is not routed here.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use salon_crm_server::config::CrmConfig;
use salon_crm_server::db::{self, CustomerStore, MemoryCustomerStore, PgCustomerStore};
use salon_crm_server::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long a store call waits for a pooled connection before it counts as
/// unavailable.
const STORE_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CrmConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = CrmConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "salon_crm_server=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // NOTE: Migrations are NOT run automatically on startup.
    if std::env::args().nth(1).as_deref() == Some("migrate") {
        let database_url = config
            .require_database_url()
            .expect("Cannot run migrations");
        let pool = db::create_pool(database_url, STORE_ACQUIRE_TIMEOUT)
            .await
            .expect("Failed to create database pool");
        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        tracing::info!("Migrations applied");
        return;
    }

    match config.database_url.clone() {
        Some(database_url) => {
            let pool = db::create_pool(&database_url, STORE_ACQUIRE_TIMEOUT)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            serve(config, Arc::new(PgCustomerStore::new(pool))).await;
        }
        None => {
            tracing::warn!("No database configured, using in-memory customer store");
            serve(config, Arc::new(MemoryCustomerStore::new())).await;
        }
    }
}

async fn serve<S: CustomerStore>(config: CrmConfig, store: Arc<S>) {
    let addr = config.socket_addr();
    let state = AppState::new(config, store);

    let app = salon_crm_server::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("share service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
