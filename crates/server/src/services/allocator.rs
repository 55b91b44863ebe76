//! Per-tenant customer identifier allocation.
//!
//! The next identifier is one above the tenant's highest numeral. The write
//! that claims it is a conditional create, so two callers racing for the same
//! number cannot both succeed: the loser sees `CrmError::AllocationConflict`
//! and recomputes.
//!
//! The insert itself is never blindly retried. A store that goes away
//! mid-insert may already have committed the row, so the allocator reads the
//! identifier back and keeps it only if the stored row is the one it wrote.

use std::sync::Arc;

use salon_crm_core::{CustomerId, TenantId};

use super::{CrmError, RetryPolicy};
use crate::db::{CustomerStore, StoreError};
use crate::models::Customer;

/// Compute the identifier after the highest numeral in `existing`.
///
/// Legacy non-numeral identifiers are ignored. The owner record `"0000"`
/// counts as zero, so an empty tenant (or one holding only the owner) starts
/// at `"0001"`.
///
/// # Errors
///
/// Returns `CrmError::AllocationExhausted` if `"9999"` is already taken.
pub fn next_customer_id<'a, I>(existing: I) -> Result<CustomerId, CrmError>
where
    I: IntoIterator<Item = &'a CustomerId>,
{
    let max = existing
        .into_iter()
        .filter_map(CustomerId::number)
        .max()
        .unwrap_or(0);

    if max >= CustomerId::MAX_NUMBER {
        return Err(CrmError::AllocationExhausted);
    }

    CustomerId::from_number(max + 1).map_err(|_| CrmError::AllocationExhausted)
}

/// Claims identifiers by conditional insert.
pub struct IdentifierAllocator<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: CustomerStore> IdentifierAllocator<S> {
    /// Create an allocator over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Pick the next identifier for `tenant` and insert the customer built
    /// for it, in one attempt.
    ///
    /// # Errors
    ///
    /// - `CrmError::AllocationConflict` if another writer claimed the id
    ///   between the read and the insert
    /// - `CrmError::AllocationExhausted` if the tenant is full
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn allocate_and_insert<F>(
        &self,
        tenant: &TenantId,
        build: F,
    ) -> Result<CustomerId, CrmError>
    where
        F: FnOnce(CustomerId) -> Customer,
    {
        let existing = self
            .retry
            .run("list_customer_ids", || self.store.list_customer_ids(tenant))
            .await?;
        let id = next_customer_id(&existing)?;
        let customer = build(id.clone());

        match self.store.insert_customer(&customer).await {
            Ok(()) => Ok(id),
            Err(StoreError::Conflict(_)) => {
                tracing::debug!(
                    tenant = %tenant,
                    customer = %id,
                    "Identifier taken, will recompute"
                );
                Err(CrmError::AllocationConflict)
            }
            Err(err) if err.is_transient() => self.confirm_insert(&customer, err).await,
            Err(err) => Err(err.into()),
        }
    }

    /// Settle an insert whose outcome was lost to `failure`.
    ///
    /// Returns the id if the stored row is ours, `AllocationConflict` if the
    /// id is free or held by someone else, and the store error if the
    /// read-back fails too.
    async fn confirm_insert(
        &self,
        customer: &Customer,
        failure: StoreError,
    ) -> Result<CustomerId, CrmError> {
        tracing::warn!(
            tenant = %customer.tenant_id,
            customer = %customer.id,
            error = %failure,
            "Insert outcome unknown, reading back"
        );

        let stored = self
            .retry
            .run("get_customer", || {
                self.store.get_customer(&customer.tenant_id, &customer.id)
            })
            .await?;

        match stored {
            Some(stored) if is_same_write(&stored, customer) => Ok(customer.id.clone()),
            _ => Err(CrmError::AllocationConflict),
        }
    }
}

/// Whether `stored` is the row built as `written`.
///
/// Timestamps are compared at microsecond precision, which is what
/// `PostgreSQL` keeps.
fn is_same_write(stored: &Customer, written: &Customer) -> bool {
    stored.created_at.timestamp_micros() == written.created_at.timestamp_micros()
        && stored.name.as_str() == written.name.as_str()
        && stored.phone.as_str() == written.phone.as_str()
        && stored.memo == written.memo
}
