//! In-memory customer store.
//!
//! Holds every tenant in process-local maps behind a single lock. Used by the
//! test suites and by local runs without `CRM_DATABASE_URL`. Failures can be
//! injected with [`MemoryCustomerStore::fail_next`] to exercise retry paths,
//! and with [`MemoryCustomerStore::lose_next_insert_acks`] to exercise writes
//! whose outcome the caller never hears about.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::RwLock;

use salon_crm_core::{CustomerId, ShareCode, TenantId, VisitId, VisitStatus};

use super::{CustomerStore, ProfileUpdate, ShareWrite, StoreError};
use crate::models::{Customer, ShareGrant, Visit};

type CustomerKey = (TenantId, CustomerId);

#[derive(Debug, Default)]
struct Inner {
    customers: HashMap<CustomerKey, Customer>,
    /// Every issued code (enabled or not) and the customer holding it.
    share_index: HashMap<ShareCode, CustomerKey>,
    visits: HashMap<VisitId, Visit>,
}

impl Inner {
    fn unindex_share(&mut self, key: &CustomerKey) {
        if let Some(code) = self
            .customers
            .get(key)
            .and_then(|c| c.share.as_ref())
            .map(|s| s.code.clone())
        {
            self.share_index.remove(&code);
        }
    }
}

/// Customer store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryCustomerStore {
    inner: RwLock<Inner>,
    injected_failures: AtomicU32,
    lost_insert_acks: AtomicU32,
}

impl MemoryCustomerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` store calls fail with `StoreError::Unavailable`.
    pub fn fail_next(&self, count: u32) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` successful customer inserts report
    /// `StoreError::Unavailable` after the row is written, as a connection
    /// dropped after commit does.
    pub fn lose_next_insert_acks(&self, count: u32) {
        self.lost_insert_acks.store(count, Ordering::SeqCst);
    }

    /// Add a visit record. Visits are owned by the reservation screens, so
    /// this sits outside the [`CustomerStore`] contract.
    pub async fn insert_visit(&self, visit: Visit) {
        self.inner.write().await.visits.insert(visit.id, visit);
    }

    /// Number of customers stored for `tenant`.
    pub async fn customer_count(&self, tenant: &TenantId) -> usize {
        self.inner
            .read()
            .await
            .customers
            .keys()
            .filter(|(t, _)| t == tenant)
            .count()
    }

    fn check_injected_failure(&self) -> Result<(), StoreError> {
        let consumed = self
            .injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(StoreError::Unavailable("injected failure".to_owned()));
        }
        Ok(())
    }
}

impl CustomerStore for MemoryCustomerStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_injected_failure()
    }

    async fn list_customer_ids(&self, tenant: &TenantId) -> Result<Vec<CustomerId>, StoreError> {
        self.check_injected_failure()?;
        let inner = self.inner.read().await;
        Ok(inner
            .customers
            .keys()
            .filter(|(t, _)| t == tenant)
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn get_customer(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
    ) -> Result<Option<Customer>, StoreError> {
        self.check_injected_failure()?;
        let inner = self.inner.read().await;
        Ok(inner.customers.get(&(tenant.clone(), id.clone())).cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        self.check_injected_failure()?;
        let key = (customer.tenant_id.clone(), customer.id.clone());
        let mut inner = self.inner.write().await;

        if inner.customers.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "customer {} already exists",
                customer.id
            )));
        }
        if let Some(share) = &customer.share {
            if inner.share_index.contains_key(&share.code) {
                return Err(StoreError::Conflict("share code already in use".to_owned()));
            }
            inner.share_index.insert(share.code.clone(), key.clone());
        }
        inner.customers.insert(key, customer.clone());

        let lost = self
            .lost_insert_acks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if lost.is_ok() {
            return Err(StoreError::Unavailable("connection lost after commit".to_owned()));
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
        update: &ProfileUpdate,
    ) -> Result<(), StoreError> {
        self.check_injected_failure()?;
        let mut inner = self.inner.write().await;
        let customer = inner
            .customers
            .get_mut(&(tenant.clone(), id.clone()))
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = &update.name {
            customer.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            customer.phone = phone.clone();
        }
        if let Some(memo) = &update.memo {
            customer.memo.clone_from(memo);
        }
        customer.updated_at = update.updated_at;
        Ok(())
    }

    async fn delete_customer(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
    ) -> Result<bool, StoreError> {
        self.check_injected_failure()?;
        let key = (tenant.clone(), id.clone());
        let mut inner = self.inner.write().await;
        inner.unindex_share(&key);
        let existed = inner.customers.remove(&key).is_some();
        inner
            .visits
            .retain(|_, v| !(v.tenant_id == *tenant && v.customer_id == *id));
        Ok(existed)
    }

    async fn write_share(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
        write: &ShareWrite,
    ) -> Result<(), StoreError> {
        self.check_injected_failure()?;
        let key = (tenant.clone(), id.clone());
        let mut inner = self.inner.write().await;
        if !inner.customers.contains_key(&key) {
            return Err(StoreError::NotFound);
        }

        match write {
            ShareWrite::Issue {
                code,
                password_hash,
                issued_at,
            } => {
                if inner.share_index.get(code).is_some_and(|holder| *holder != key) {
                    return Err(StoreError::Conflict("share code already in use".to_owned()));
                }
                inner.unindex_share(&key);
                inner.share_index.insert(code.clone(), key.clone());
                if let Some(customer) = inner.customers.get_mut(&key) {
                    customer.share = Some(ShareGrant {
                        code: code.clone(),
                        enabled: true,
                        password_hash: password_hash.clone(),
                        issued_at: *issued_at,
                    });
                    customer.updated_at = *issued_at;
                }
            }
            ShareWrite::Enable => {
                let share = inner
                    .customers
                    .get_mut(&key)
                    .and_then(|c| c.share.as_mut())
                    .ok_or(StoreError::NotFound)?;
                share.enabled = true;
            }
            ShareWrite::Disable => {
                if let Some(share) = inner.customers.get_mut(&key).and_then(|c| c.share.as_mut())
                {
                    share.enabled = false;
                }
            }
        }
        Ok(())
    }

    async fn find_by_share_code(&self, code: &ShareCode) -> Result<Option<Customer>, StoreError> {
        self.check_injected_failure()?;
        let inner = self.inner.read().await;
        let customer = inner
            .share_index
            .get(code)
            .and_then(|key| inner.customers.get(key))
            .filter(|c| c.share.as_ref().is_some_and(|s| s.enabled && s.code == *code));
        Ok(customer.cloned())
    }

    async fn find_visit(
        &self,
        tenant: &TenantId,
        customer: &CustomerId,
        visit: VisitId,
    ) -> Result<Option<Visit>, StoreError> {
        self.check_injected_failure()?;
        let inner = self.inner.read().await;
        Ok(inner
            .visits
            .get(&visit)
            .filter(|v| v.tenant_id == *tenant && v.customer_id == *customer)
            .cloned())
    }

    async fn list_completed_visits(
        &self,
        tenant: &TenantId,
        customer: &CustomerId,
        limit: u32,
    ) -> Result<Vec<Visit>, StoreError> {
        self.check_injected_failure()?;
        let inner = self.inner.read().await;
        let mut visits: Vec<Visit> = inner
            .visits
            .values()
            .filter(|v| {
                v.tenant_id == *tenant
                    && v.customer_id == *customer
                    && v.status == VisitStatus::Completed
            })
            .cloned()
            .collect();
        visits.sort_by(|a, b| b.visited_at.cmp(&a.visited_at));
        visits.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(visits)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use salon_crm_core::{DisplayName, PhoneTail};

    use super::*;

    fn tenant(name: &str) -> TenantId {
        TenantId::parse(name).unwrap()
    }

    fn customer(tenant_id: &TenantId, n: u16) -> Customer {
        let now = Utc::now();
        Customer {
            tenant_id: tenant_id.clone(),
            id: CustomerId::from_number(n).unwrap(),
            name: DisplayName::from_stored("J*** D**".to_owned()),
            phone: PhoneTail::from_stored("5678".to_owned()),
            memo: None,
            created_at: now,
            updated_at: now,
            share: None,
        }
    }

    fn code(s: &str) -> ShareCode {
        ShareCode::parse(s).unwrap()
    }

    fn issue(s: &str) -> ShareWrite {
        ShareWrite::Issue {
            code: code(s),
            password_hash: None,
            issued_at: Utc::now(),
        }
    }

    fn visit(
        tenant_id: &TenantId,
        customer_id: &CustomerId,
        days_ago: i64,
        status: VisitStatus,
    ) -> Visit {
        Visit {
            id: VisitId::generate(),
            tenant_id: tenant_id.clone(),
            customer_id: customer_id.clone(),
            visited_at: Utc::now() - Duration::days(days_ago),
            menu: "Cut".to_owned(),
            price: None,
            status,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_insert_is_conditional() {
        let store = MemoryCustomerStore::new();
        let t = tenant("salon-a");
        store.insert_customer(&customer(&t, 1)).await.unwrap();

        let err = store.insert_customer(&customer(&t, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Same id in another tenant is a different document.
        store.insert_customer(&customer(&tenant("salon-b"), 1)).await.unwrap();
        assert_eq!(store.customer_count(&t).await, 1);
    }

    #[tokio::test]
    async fn test_list_ids_is_tenant_scoped() {
        let store = MemoryCustomerStore::new();
        let a = tenant("salon-a");
        let b = tenant("salon-b");
        store.insert_customer(&customer(&a, 1)).await.unwrap();
        store.insert_customer(&customer(&a, 2)).await.unwrap();
        store.insert_customer(&customer(&b, 7)).await.unwrap();

        let mut ids = store.list_customer_ids(&a).await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![
            CustomerId::from_number(1).unwrap(),
            CustomerId::from_number(2).unwrap()
        ]);
    }

    #[tokio::test]
    async fn test_share_code_unique_across_tenants() {
        let store = MemoryCustomerStore::new();
        let a = tenant("salon-a");
        let b = tenant("salon-b");
        let id = CustomerId::from_number(1).unwrap();
        store.insert_customer(&customer(&a, 1)).await.unwrap();
        store.insert_customer(&customer(&b, 1)).await.unwrap();

        store.write_share(&a, &id, &issue("sharecode-0001")).await.unwrap();
        let err = store
            .write_share(&b, &id, &issue("sharecode-0001"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reissue_replaces_old_code() {
        let store = MemoryCustomerStore::new();
        let t = tenant("salon-a");
        let id = CustomerId::from_number(1).unwrap();
        store.insert_customer(&customer(&t, 1)).await.unwrap();

        store.write_share(&t, &id, &issue("sharecode-old1")).await.unwrap();
        store.write_share(&t, &id, &issue("sharecode-new1")).await.unwrap();

        assert!(store.find_by_share_code(&code("sharecode-old1")).await.unwrap().is_none());
        let found = store.find_by_share_code(&code("sharecode-new1")).await.unwrap();
        assert_eq!(found.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_disabled_share_does_not_resolve() {
        let store = MemoryCustomerStore::new();
        let t = tenant("salon-a");
        let id = CustomerId::from_number(1).unwrap();
        store.insert_customer(&customer(&t, 1)).await.unwrap();
        store.write_share(&t, &id, &issue("sharecode-0001")).await.unwrap();

        store.write_share(&t, &id, &ShareWrite::Disable).await.unwrap();
        assert!(store.find_by_share_code(&code("sharecode-0001")).await.unwrap().is_none());

        store.write_share(&t, &id, &ShareWrite::Enable).await.unwrap();
        assert!(store.find_by_share_code(&code("sharecode-0001")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_enable_without_code_is_not_found() {
        let store = MemoryCustomerStore::new();
        let t = tenant("salon-a");
        store.insert_customer(&customer(&t, 1)).await.unwrap();

        let err = store
            .write_share(&t, &CustomerId::from_number(1).unwrap(), &ShareWrite::Enable)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_releases_share_code() {
        let store = MemoryCustomerStore::new();
        let t = tenant("salon-a");
        let id = CustomerId::from_number(1).unwrap();
        store.insert_customer(&customer(&t, 1)).await.unwrap();
        store.write_share(&t, &id, &issue("sharecode-0001")).await.unwrap();

        assert!(store.delete_customer(&t, &id).await.unwrap());
        assert!(!store.delete_customer(&t, &id).await.unwrap());
        assert!(store.find_by_share_code(&code("sharecode-0001")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_completed_visits_newest_first_and_bounded() {
        let store = MemoryCustomerStore::new();
        let t = tenant("salon-a");
        let id = CustomerId::from_number(1).unwrap();
        store.insert_visit(visit(&t, &id, 10, VisitStatus::Completed)).await;
        store.insert_visit(visit(&t, &id, 1, VisitStatus::Completed)).await;
        store.insert_visit(visit(&t, &id, 5, VisitStatus::Completed)).await;
        store.insert_visit(visit(&t, &id, 0, VisitStatus::Scheduled)).await;
        store
            .insert_visit(visit(&tenant("salon-b"), &id, 0, VisitStatus::Completed))
            .await;

        let visits = store.list_completed_visits(&t, &id, 2).await.unwrap();
        assert_eq!(visits.len(), 2);
        assert!(visits[0].visited_at > visits[1].visited_at);
        assert!(visits.iter().all(|v| v.status == VisitStatus::Completed));
    }

    #[tokio::test]
    async fn test_find_visit_is_scoped_to_customer() {
        let store = MemoryCustomerStore::new();
        let t = tenant("salon-a");
        let owner = CustomerId::from_number(1).unwrap();
        let other = CustomerId::from_number(2).unwrap();
        let v = visit(&t, &owner, 1, VisitStatus::Completed);
        let visit_id = v.id;
        store.insert_visit(v).await;

        assert!(store.find_visit(&t, &owner, visit_id).await.unwrap().is_some());
        assert!(store.find_visit(&t, &other, visit_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryCustomerStore::new();
        store.fail_next(2);

        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_lost_insert_ack_still_writes() {
        let store = MemoryCustomerStore::new();
        let t = tenant("salon-a");
        store.lose_next_insert_acks(1);

        assert!(matches!(
            store.insert_customer(&customer(&t, 1)).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.customer_count(&t).await, 1);
        assert!(store.insert_customer(&customer(&t, 2)).await.is_ok());
    }
}
