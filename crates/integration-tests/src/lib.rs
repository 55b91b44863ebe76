//! Integration tests for the salon CRM.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p salon-crm-integration-tests
//! ```
//!
//! Every test runs against [`MemoryCustomerStore`], so no database is needed.
//!
//! # Test Categories
//!
//! - `customer_identity` - Allocation and write-time masking through the services
//! - `share_lifecycle` - Issuing, rotating and disabling share links
//! - `share_site` - The public share site over HTTP

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use salon_crm_core::{CurrencyCode, CustomerId, Price, TenantId, VisitId, VisitStatus};
use salon_crm_server::config::CrmConfig;
use salon_crm_server::db::MemoryCustomerStore;
use salon_crm_server::models::{NewCustomer, Visit};
use salon_crm_server::services::TenantContext;
use salon_crm_server::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

/// Services and router wired over one in-memory store.
pub struct TestApp {
    pub state: AppState<MemoryCustomerStore>,
    pub store: Arc<MemoryCustomerStore>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::with_config(CrmConfig::default())
    }
}

impl TestApp {
    /// Build an app over a fresh store with `config`.
    #[must_use]
    pub fn with_config(config: CrmConfig) -> Self {
        let store = Arc::new(MemoryCustomerStore::new());
        let state = AppState::new(config, Arc::clone(&store));
        let router = salon_crm_server::app(state.clone());
        Self {
            state,
            store,
            router,
        }
    }

    /// Create a customer, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the customer service rejects the input.
    pub async fn create_customer(
        &self,
        ctx: &TenantContext,
        name: &str,
        phone: &str,
    ) -> CustomerId {
        self.state
            .customers()
            .create_customer(
                ctx,
                &NewCustomer {
                    name: name.to_string(),
                    phone: phone.to_string(),
                    memo: None,
                },
            )
            .await
            .expect("Failed to create test customer")
    }

    /// Store a visit for a customer `days_ago` days in the past.
    pub async fn add_visit(
        &self,
        ctx: &TenantContext,
        customer: &CustomerId,
        menu: &str,
        status: VisitStatus,
        days_ago: i64,
    ) -> VisitId {
        let id = VisitId::generate();
        self.store
            .insert_visit(Visit {
                id,
                tenant_id: ctx.tenant_id().clone(),
                customer_id: customer.clone(),
                visited_at: Utc::now() - Duration::days(days_ago),
                menu: menu.to_string(),
                price: Some(Price::new(Decimal::new(45_000, 0), CurrencyCode::KRW)),
                status,
                note: None,
            })
            .await;
        id
    }

    /// Send one request through the share site router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };

        TestResponse {
            status,
            cookie,
            body,
        }
    }
}

/// A response from [`TestApp::send`].
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    /// `name=value` part of the `Set-Cookie` header, if one was sent.
    pub cookie: Option<String>,
    /// Parsed JSON body, `Null` when empty.
    pub body: Value,
}

impl TestResponse {
    /// The `code` field of an error body.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("code").and_then(Value::as_str)
    }
}

/// Tenant context for `slug`.
///
/// # Panics
///
/// Panics if `slug` is not a valid tenant id.
#[must_use]
pub fn tenant(slug: &str) -> TenantContext {
    TenantContext::new(TenantId::parse(slug).expect("Invalid tenant id"))
}
