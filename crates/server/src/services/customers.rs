//! Tenant-side customer operations.
//!
//! Plaintext names and phone numbers enter here and are reduced by the
//! [`PiiTransform`] before anything is written. Only the owner record
//! (`"0000"`) keeps its fields verbatim.

use std::sync::Arc;

use chrono::Utc;
use salon_crm_core::{CustomerId, DisplayName, PhoneTail, PiiTransform};

use super::allocator::IdentifierAllocator;
use super::{CrmError, RetryPolicy, TenantContext};
use crate::db::{CustomerStore, ProfileUpdate, StoreError};
use crate::models::{Customer, CustomerUpdate, NewCustomer};

/// Maximum length of a plaintext name, in characters.
const MAX_NAME_LENGTH: usize = 100;
/// Maximum length of a plaintext phone number, in characters.
const MAX_PHONE_LENGTH: usize = 32;
/// Maximum length of a memo, in characters.
const MAX_MEMO_LENGTH: usize = 2000;

fn validate_name(name: &str) -> Result<(), CrmError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CrmError::InvalidInput("name is required".to_owned()));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(CrmError::InvalidInput(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), CrmError> {
    if phone.chars().count() > MAX_PHONE_LENGTH {
        return Err(CrmError::InvalidInput(format!(
            "phone must be at most {MAX_PHONE_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_memo(memo: Option<&str>) -> Result<(), CrmError> {
    if memo.is_some_and(|m| m.chars().count() > MAX_MEMO_LENGTH) {
        return Err(CrmError::InvalidInput(format!(
            "memo must be at most {MAX_MEMO_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Customer create, read, update and delete for one tenant at a time.
pub struct CustomerService<S> {
    store: Arc<S>,
    allocator: IdentifierAllocator<S>,
    pii: Arc<PiiTransform>,
    retry: RetryPolicy,
    max_attempts: u32,
}

impl<S: CustomerStore> CustomerService<S> {
    /// Create a new customer service.
    ///
    /// `max_attempts` bounds how many identifiers `create_customer` tries
    /// when concurrent writers keep claiming them first.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        pii: Arc<PiiTransform>,
        retry: RetryPolicy,
        max_attempts: u32,
    ) -> Self {
        Self {
            allocator: IdentifierAllocator::new(Arc::clone(&store), retry),
            store,
            pii,
            retry,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Create a customer with the next free identifier.
    ///
    /// # Errors
    ///
    /// - `CrmError::InvalidInput` if a field fails validation
    /// - `CrmError::AllocationExhausted` if the tenant already uses `9999`
    /// - `CrmError::AllocationConflict` if every attempt lost a race
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn create_customer(
        &self,
        ctx: &TenantContext,
        input: &NewCustomer,
    ) -> Result<CustomerId, CrmError> {
        validate_name(&input.name)?;
        validate_phone(&input.phone)?;
        validate_memo(input.memo.as_deref())?;

        let tenant = ctx.tenant_id();
        let name = self.pii.mask_name(&input.name);
        let phone = self.pii.mask_phone(&input.phone);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .allocator
                .allocate_and_insert(tenant, |id| {
                    let now = Utc::now();
                    Customer {
                        tenant_id: tenant.clone(),
                        id,
                        name: name.clone(),
                        phone: phone.clone(),
                        memo: input.memo.clone(),
                        created_at: now,
                        updated_at: now,
                        share: None,
                    }
                })
                .await;

            match result {
                Ok(id) => {
                    tracing::info!(tenant = %tenant, customer = %id, "Customer created");
                    return Ok(id);
                }
                Err(CrmError::AllocationConflict) if attempt < self.max_attempts => {}
                Err(err) => {
                    tracing::warn!(
                        tenant = %tenant,
                        attempt,
                        error = %err,
                        "Customer create failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Apply a partial edit. New plaintext is masked; untouched fields keep
    /// their stored (already reduced) values.
    ///
    /// # Errors
    ///
    /// - `CrmError::InvalidInput` if a field fails validation
    /// - `CrmError::CustomerNotFound` if the customer does not exist
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn update_customer(
        &self,
        ctx: &TenantContext,
        id: &CustomerId,
        update: &CustomerUpdate,
    ) -> Result<(), CrmError> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(phone) = &update.phone {
            validate_phone(phone)?;
        }
        validate_memo(update.memo.as_ref().and_then(Option::as_deref))?;

        if update.is_empty() {
            return Ok(());
        }

        let owner = id.is_owner();
        let profile = ProfileUpdate {
            name: update.name.as_deref().map(|n| {
                if owner {
                    DisplayName::owner(n)
                } else {
                    self.pii.mask_name(n)
                }
            }),
            phone: update.phone.as_deref().map(|p| {
                if owner {
                    PhoneTail::owner(p)
                } else {
                    self.pii.mask_phone(p)
                }
            }),
            memo: update.memo.clone(),
            updated_at: Utc::now(),
        };

        let tenant = ctx.tenant_id();
        self.retry
            .run("update_profile", || {
                self.store.update_profile(tenant, id, &profile)
            })
            .await?;

        tracing::info!(tenant = %tenant, customer = %id, "Customer updated");
        Ok(())
    }

    /// Read one customer of the tenant.
    ///
    /// # Errors
    ///
    /// - `CrmError::CustomerNotFound` if the customer does not exist
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn get_customer(
        &self,
        ctx: &TenantContext,
        id: &CustomerId,
    ) -> Result<Customer, CrmError> {
        let tenant = ctx.tenant_id();
        self.retry
            .run("get_customer", || self.store.get_customer(tenant, id))
            .await?
            .ok_or(CrmError::CustomerNotFound)
    }

    /// Hard-delete a customer.
    ///
    /// # Errors
    ///
    /// - `CrmError::CustomerNotFound` if the customer does not exist
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn delete_customer(
        &self,
        ctx: &TenantContext,
        id: &CustomerId,
    ) -> Result<(), CrmError> {
        let tenant = ctx.tenant_id();
        let existed = self
            .retry
            .run("delete_customer", || self.store.delete_customer(tenant, id))
            .await?;

        if !existed {
            return Err(CrmError::CustomerNotFound);
        }
        tracing::info!(tenant = %tenant, customer = %id, "Customer deleted");
        Ok(())
    }

    /// Provision the tenant owner's own record at `"0000"`, unmasked.
    ///
    /// Returns `true` if the record was created, `false` if it already
    /// existed.
    ///
    /// # Errors
    ///
    /// - `CrmError::InvalidInput` if a field fails validation
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn ensure_owner_record(
        &self,
        ctx: &TenantContext,
        name: &str,
        phone: &str,
    ) -> Result<bool, CrmError> {
        validate_name(name)?;
        validate_phone(phone)?;

        let now = Utc::now();
        let owner = Customer {
            tenant_id: ctx.tenant_id().clone(),
            id: CustomerId::owner(),
            name: DisplayName::owner(name),
            phone: PhoneTail::owner(phone),
            memo: None,
            created_at: now,
            updated_at: now,
            share: None,
        };

        match self
            .retry
            .run("insert_owner", || self.store.insert_customer(&owner))
            .await
        {
            Ok(()) => {
                tracing::info!(tenant = %owner.tenant_id, "Owner record provisioned");
                Ok(true)
            }
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use salon_crm_core::TenantId;

    use super::*;
    use crate::db::MemoryCustomerStore;

    fn service(store: &Arc<MemoryCustomerStore>) -> CustomerService<MemoryCustomerStore> {
        CustomerService::new(
            Arc::clone(store),
            Arc::new(PiiTransform::default()),
            RetryPolicy::none(),
            8,
        )
    }

    fn ctx(name: &str) -> TenantContext {
        TenantContext::new(TenantId::parse(name).unwrap())
    }

    fn new_customer(name: &str, phone: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_owned(),
            phone: phone.to_owned(),
            memo: None,
        }
    }

    #[tokio::test]
    async fn test_create_masks_before_write() {
        let store = Arc::new(MemoryCustomerStore::new());
        let customers = service(&store);
        let ctx = ctx("salon-a");

        let id = customers
            .create_customer(&ctx, &new_customer("김민수", "010-1234-5678"))
            .await
            .unwrap();
        let stored = customers.get_customer(&ctx, &id).await.unwrap();

        assert_eq!(id.as_str(), "0001");
        assert_eq!(stored.name.as_str(), "김*수");
        assert_eq!(stored.phone.as_str(), "5678");
    }

    #[tokio::test]
    async fn test_update_masks_only_new_plaintext() {
        let store = Arc::new(MemoryCustomerStore::new());
        let customers = service(&store);
        let ctx = ctx("salon-a");
        let id = customers
            .create_customer(&ctx, &new_customer("John Smith", "010-1234-5678"))
            .await
            .unwrap();

        let update = CustomerUpdate {
            phone: Some("010-9999-0000".into()),
            memo: Some(Some("prefers mornings".into())),
            ..CustomerUpdate::default()
        };
        customers.update_customer(&ctx, &id, &update).await.unwrap();

        let stored = customers.get_customer(&ctx, &id).await.unwrap();
        assert_eq!(stored.name.as_str(), "John S****");
        assert_eq!(stored.phone.as_str(), "0000");
        assert_eq!(stored.memo.as_deref(), Some("prefers mornings"));
    }

    #[tokio::test]
    async fn test_update_missing_customer() {
        let store = Arc::new(MemoryCustomerStore::new());
        let customers = service(&store);
        let update = CustomerUpdate {
            name: Some("Ann Lee".into()),
            ..CustomerUpdate::default()
        };

        let err = customers
            .update_customer(&ctx("salon-a"), &CustomerId::from_number(42).unwrap(), &update)
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::CustomerNotFound));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name() {
        let store = Arc::new(MemoryCustomerStore::new());
        let err = service(&store)
            .create_customer(&ctx("salon-a"), &new_customer("  ", "1234"))
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_owner_record_is_unmasked_and_idempotent() {
        let store = Arc::new(MemoryCustomerStore::new());
        let customers = service(&store);
        let ctx = ctx("salon-a");

        assert!(customers.ensure_owner_record(&ctx, "김민수", "010-1234-5678").await.unwrap());
        assert!(!customers.ensure_owner_record(&ctx, "Someone Else", "1").await.unwrap());

        let owner = customers.get_customer(&ctx, &CustomerId::owner()).await.unwrap();
        assert_eq!(owner.name.as_str(), "김민수");
        assert_eq!(owner.phone.as_str(), "010-1234-5678");

        // The owner record does not shift allocation.
        let id = customers
            .create_customer(&ctx, &new_customer("Ann Lee", "1234"))
            .await
            .unwrap();
        assert_eq!(id.as_str(), "0001");
    }

    #[tokio::test]
    async fn test_owner_update_stays_unmasked() {
        let store = Arc::new(MemoryCustomerStore::new());
        let customers = service(&store);
        let ctx = ctx("salon-a");
        customers.ensure_owner_record(&ctx, "Jane Doe", "1234").await.unwrap();

        let update = CustomerUpdate {
            name: Some("Jane Q Doe".into()),
            ..CustomerUpdate::default()
        };
        customers.update_customer(&ctx, &CustomerId::owner(), &update).await.unwrap();

        let owner = customers.get_customer(&ctx, &CustomerId::owner()).await.unwrap();
        assert_eq!(owner.name.as_str(), "Jane Q Doe");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = Arc::new(MemoryCustomerStore::new());
        let customers = service(&store);
        let ctx = ctx("salon-a");
        let id = customers
            .create_customer(&ctx, &new_customer("Ann Lee", "1234"))
            .await
            .unwrap();

        customers.delete_customer(&ctx, &id).await.unwrap();
        assert!(matches!(
            customers.delete_customer(&ctx, &id).await,
            Err(CrmError::CustomerNotFound)
        ));
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = Arc::new(MemoryCustomerStore::new());
        let customers = service(&store);
        let a = ctx("salon-a");
        let b = ctx("salon-b");

        let id_a = customers.create_customer(&a, &new_customer("Ann Lee", "1")).await.unwrap();
        let id_b = customers.create_customer(&b, &new_customer("Bo Kim", "2")).await.unwrap();

        assert_eq!(id_a, id_b);
        assert_eq!(customers.get_customer(&a, &id_a).await.unwrap().name.as_str(), "Ann L**");
        assert_eq!(customers.get_customer(&b, &id_b).await.unwrap().name.as_str(), "Bo K**");
    }
}
