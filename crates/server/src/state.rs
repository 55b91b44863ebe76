//! Application state shared across handlers.

use std::sync::Arc;

use salon_crm_core::PiiTransform;

use crate::config::CrmConfig;
use crate::db::CustomerStore;
use crate::services::{CustomerService, RetryPolicy, ShareGateway, ShareManager};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// store, the services built over it, and configuration.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    config: CrmConfig,
    store: Arc<S>,
    customers: CustomerService<S>,
    shares: ShareManager<S>,
    gateway: ShareGateway<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CustomerStore> AppState<S> {
    /// Create a new application state over `store`.
    ///
    /// # Arguments
    ///
    /// * `config` - Service configuration
    /// * `store` - Customer store backend
    #[must_use]
    pub fn new(config: CrmConfig, store: Arc<S>) -> Self {
        let pii = Arc::new(PiiTransform::default());
        let customers = CustomerService::new(
            Arc::clone(&store),
            pii,
            config.store_retry,
            config.allocation_max_attempts,
        );
        let shares = ShareManager::new(Arc::clone(&store), config.store_retry);
        // Public reads are not retried; the visitor reloads by hand.
        let gateway = ShareGateway::new(Arc::clone(&store), RetryPolicy::none(), config.gateway);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                customers,
                shares,
                gateway,
            }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &CrmConfig {
        &self.inner.config
    }

    /// Get a reference to the customer store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get the tenant-side customer service.
    #[must_use]
    pub fn customers(&self) -> &CustomerService<S> {
        &self.inner.customers
    }

    /// Get the tenant-side share manager.
    #[must_use]
    pub fn shares(&self) -> &ShareManager<S> {
        &self.inner.shares
    }

    /// Get the public share gateway.
    #[must_use]
    pub fn gateway(&self) -> &ShareGateway<S> {
        &self.inner.gateway
    }
}
