//! Anonymous reads through a share link.
//!
//! Every read re-resolves the token against the store and re-checks the
//! password gate, so a disabled or rotated link stops working at once no
//! matter what the caller's session remembers. Every outcome that is not a
//! successful read or a password prompt collapses into
//! `CrmError::ShareNotFound`.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use salon_crm_core::{ShareCode, VisitId};

use super::share::verify_password;
use super::{CrmError, RetryPolicy};
use crate::db::CustomerStore;
use crate::models::{Customer, CustomerShareView, ShareGrant, ShareSession, VisitView};

/// Maximum number of tokens tracked by the failed-unlock counter.
const ATTEMPT_CACHE_CAPACITY: u64 = 10_000;

/// Tunables for the gateway.
#[derive(Debug, Clone, Copy)]
pub struct GatewayLimits {
    /// Maximum completed visits returned by one list read.
    pub visit_limit: u32,
    /// Failed unlocks allowed per token within `unlock_window`.
    pub max_failed_unlocks: u32,
    /// How long failed unlocks are remembered.
    pub unlock_window: Duration,
}

impl Default for GatewayLimits {
    fn default() -> Self {
        Self {
            visit_limit: 50,
            max_failed_unlocks: 5,
            unlock_window: Duration::from_secs(900),
        }
    }
}

/// Resolves share tokens to the single customer they grant access to.
pub struct ShareGateway<S> {
    store: Arc<S>,
    retry: RetryPolicy,
    limits: GatewayLimits,
    failed_unlocks: Cache<ShareCode, u32>,
}

impl<S: CustomerStore> ShareGateway<S> {
    /// Create a new gateway.
    ///
    /// `retry` should normally be [`RetryPolicy::none`]: a failed public read
    /// is reported and the visitor retries by hand.
    #[must_use]
    pub fn new(store: Arc<S>, retry: RetryPolicy, limits: GatewayLimits) -> Self {
        let failed_unlocks = Cache::builder()
            .max_capacity(ATTEMPT_CACHE_CAPACITY)
            .time_to_live(limits.unlock_window)
            .build();

        Self {
            store,
            retry,
            limits,
            failed_unlocks,
        }
    }

    /// Find the enabled share for a raw token from a URL.
    async fn resolve(&self, raw_code: &str) -> Result<(ShareCode, Customer, ShareGrant), CrmError> {
        let code = ShareCode::parse(raw_code).map_err(|_| CrmError::ShareNotFound)?;
        let customer = self
            .retry
            .run("find_by_share_code", || self.store.find_by_share_code(&code))
            .await?
            .ok_or(CrmError::ShareNotFound)?;

        let grant = customer
            .share
            .clone()
            .filter(|s| s.enabled && s.code == code)
            .ok_or(CrmError::ShareNotFound)?;

        Ok((code, customer, grant))
    }

    /// Resolve and require that the session may read this share.
    async fn authorize(
        &self,
        raw_code: &str,
        session: &ShareSession,
    ) -> Result<(Customer, ShareGrant), CrmError> {
        let (code, customer, grant) = self.resolve(raw_code).await?;
        if grant.is_password_protected() && !session.is_unlocked(&code, grant.issued_at) {
            return Err(CrmError::PasswordRequired);
        }
        Ok((customer, grant))
    }

    /// The shared view of the customer behind `raw_code`.
    ///
    /// # Errors
    ///
    /// - `CrmError::ShareNotFound` if the token is malformed, unknown or disabled
    /// - `CrmError::PasswordRequired` if the share is locked for this session
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn resolve_by_token(
        &self,
        raw_code: &str,
        session: &ShareSession,
    ) -> Result<CustomerShareView, CrmError> {
        let (customer, grant) = self.authorize(raw_code, session).await?;
        Ok(CustomerShareView {
            display_name: customer.name,
            shared_since: grant.issued_at,
        })
    }

    /// Verify the share password and remember the unlock in `session`.
    ///
    /// An unprotected share unlocks without checking `candidate` and leaves
    /// `session` untouched. Returns whether `session` changed.
    ///
    /// Every attempt on a protected share is counted before the password is
    /// checked, so parallel guesses cannot all slip under the limit.
    ///
    /// # Errors
    ///
    /// - `CrmError::ShareNotFound` if the token is malformed, unknown or disabled
    /// - `CrmError::TooManyAttempts` if the token saw too many unlock attempts
    /// - `CrmError::PasswordIncorrect` if `candidate` is wrong
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn unlock(
        &self,
        raw_code: &str,
        candidate: &str,
        session: &mut ShareSession,
    ) -> Result<bool, CrmError> {
        let (code, _customer, grant) = self.resolve(raw_code).await?;
        let Some(hash) = &grant.password_hash else {
            return Ok(false);
        };

        let attempts = self
            .failed_unlocks
            .entry(code.clone())
            .and_upsert_with(|entry| async move {
                entry.map_or(1, |e| e.into_value().saturating_add(1))
            })
            .await
            .into_value();
        if attempts > self.limits.max_failed_unlocks {
            tracing::warn!(attempts, "Share unlock throttled");
            return Err(CrmError::TooManyAttempts);
        }

        if !verify_password(candidate, hash) {
            tracing::info!(failures = attempts, "Share unlock failed");
            return Err(CrmError::PasswordIncorrect);
        }

        self.failed_unlocks.invalidate(&code).await;
        session.mark_unlocked(code, grant.issued_at);
        Ok(true)
    }

    /// One visit of the shared customer, by id.
    ///
    /// # Errors
    ///
    /// - `CrmError::ShareNotFound` if the token or visit id is malformed,
    ///   unknown, disabled, or the visit belongs to someone else
    /// - `CrmError::PasswordRequired` if the share is locked for this session
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn visit(
        &self,
        raw_code: &str,
        raw_visit_id: &str,
        session: &ShareSession,
    ) -> Result<VisitView, CrmError> {
        let (customer, _grant) = self.authorize(raw_code, session).await?;
        let visit_id = VisitId::parse(raw_visit_id).map_err(|_| CrmError::ShareNotFound)?;

        self.retry
            .run("find_visit", || {
                self.store
                    .find_visit(&customer.tenant_id, &customer.id, visit_id)
            })
            .await?
            .map(VisitView::from)
            .ok_or(CrmError::ShareNotFound)
    }

    /// The shared customer's most recent completed visits, newest first.
    ///
    /// # Errors
    ///
    /// - `CrmError::ShareNotFound` if the token is malformed, unknown or disabled
    /// - `CrmError::PasswordRequired` if the share is locked for this session
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn completed_visits(
        &self,
        raw_code: &str,
        session: &ShareSession,
    ) -> Result<Vec<VisitView>, CrmError> {
        let (customer, _grant) = self.authorize(raw_code, session).await?;
        let visits = self
            .retry
            .run("list_completed_visits", || {
                self.store.list_completed_visits(
                    &customer.tenant_id,
                    &customer.id,
                    self.limits.visit_limit,
                )
            })
            .await?;
        Ok(visits.into_iter().map(VisitView::from).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use salon_crm_core::{CustomerId, PiiTransform, TenantId, VisitStatus};

    use super::*;
    use crate::db::MemoryCustomerStore;
    use crate::models::{NewCustomer, Visit};
    use crate::services::{CustomerService, ShareManager, TenantContext};

    struct Fixture {
        store: Arc<MemoryCustomerStore>,
        shares: ShareManager<MemoryCustomerStore>,
        gateway: ShareGateway<MemoryCustomerStore>,
        ctx: TenantContext,
        id: CustomerId,
    }

    async fn fixture(limits: GatewayLimits) -> Fixture {
        let store = Arc::new(MemoryCustomerStore::new());
        let customers = CustomerService::new(
            Arc::clone(&store),
            Arc::new(PiiTransform::default()),
            RetryPolicy::none(),
            4,
        );
        let ctx = TenantContext::new(TenantId::parse("salon-a").unwrap());
        let id = customers
            .create_customer(
                &ctx,
                &NewCustomer {
                    name: "John Smith".into(),
                    phone: "010-1234-5678".into(),
                    memo: Some("private".into()),
                },
            )
            .await
            .unwrap();

        Fixture {
            shares: ShareManager::new(Arc::clone(&store), RetryPolicy::none()),
            gateway: ShareGateway::new(Arc::clone(&store), RetryPolicy::none(), limits),
            store,
            ctx,
            id,
        }
    }

    fn visit(f: &Fixture, days_ago: i64, status: VisitStatus) -> Visit {
        Visit {
            id: VisitId::generate(),
            tenant_id: f.ctx.tenant_id().clone(),
            customer_id: f.id.clone(),
            visited_at: Utc::now() - ChronoDuration::days(days_ago),
            menu: "Cut".into(),
            price: None,
            status,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_open_share_resolves() {
        let f = fixture(GatewayLimits::default()).await;
        let code = f.shares.create_share(&f.ctx, &f.id, None).await.unwrap();

        let view = f
            .gateway
            .resolve_by_token(code.as_str(), &ShareSession::default())
            .await
            .unwrap();
        assert_eq!(view.display_name.as_str(), "John S****");
    }

    #[tokio::test]
    async fn test_unknown_malformed_and_disabled_are_indistinguishable() {
        let f = fixture(GatewayLimits::default()).await;
        let code = f.shares.create_share(&f.ctx, &f.id, None).await.unwrap();
        f.shares.disable_share(&f.ctx, &f.id).await.unwrap();
        let session = ShareSession::default();

        for raw in [code.as_str(), "never-issued-token-xyz", "bad", "../../etc"] {
            assert!(matches!(
                f.gateway.resolve_by_token(raw, &session).await,
                Err(CrmError::ShareNotFound)
            ));
        }
    }

    #[tokio::test]
    async fn test_password_gate() {
        let f = fixture(GatewayLimits::default()).await;
        let code = f.shares.create_share(&f.ctx, &f.id, Some("abcd")).await.unwrap();
        let mut session = ShareSession::default();

        assert!(matches!(
            f.gateway.resolve_by_token(code.as_str(), &session).await,
            Err(CrmError::PasswordRequired)
        ));
        assert!(matches!(
            f.gateway.unlock(code.as_str(), "nope", &mut session).await,
            Err(CrmError::PasswordIncorrect)
        ));

        f.gateway.unlock(code.as_str(), "abcd", &mut session).await.unwrap();
        assert!(f.gateway.resolve_by_token(code.as_str(), &session).await.is_ok());
    }

    #[tokio::test]
    async fn test_regenerate_invalidates_session_unlock() {
        let f = fixture(GatewayLimits::default()).await;
        let code = f.shares.create_share(&f.ctx, &f.id, Some("abcd")).await.unwrap();
        let mut session = ShareSession::default();
        f.gateway.unlock(code.as_str(), "abcd", &mut session).await.unwrap();

        let new_code = f.shares.regenerate_share(&f.ctx, &f.id, Some("efgh")).await.unwrap();
        assert!(matches!(
            f.gateway.resolve_by_token(code.as_str(), &session).await,
            Err(CrmError::ShareNotFound)
        ));
        assert!(matches!(
            f.gateway.resolve_by_token(new_code.as_str(), &session).await,
            Err(CrmError::PasswordRequired)
        ));
    }

    #[tokio::test]
    async fn test_disable_overrides_session_unlock() {
        let f = fixture(GatewayLimits::default()).await;
        let code = f.shares.create_share(&f.ctx, &f.id, Some("abcd")).await.unwrap();
        let mut session = ShareSession::default();
        f.gateway.unlock(code.as_str(), "abcd", &mut session).await.unwrap();

        f.shares.disable_share(&f.ctx, &f.id).await.unwrap();
        assert!(matches!(
            f.gateway.completed_visits(code.as_str(), &session).await,
            Err(CrmError::ShareNotFound)
        ));
    }

    #[tokio::test]
    async fn test_unlock_is_throttled() {
        let limits = GatewayLimits {
            max_failed_unlocks: 2,
            ..GatewayLimits::default()
        };
        let f = fixture(limits).await;
        let code = f.shares.create_share(&f.ctx, &f.id, Some("abcd")).await.unwrap();
        let mut session = ShareSession::default();

        for _ in 0..2 {
            assert!(matches!(
                f.gateway.unlock(code.as_str(), "nope", &mut session).await,
                Err(CrmError::PasswordIncorrect)
            ));
        }
        assert!(matches!(
            f.gateway.unlock(code.as_str(), "abcd", &mut session).await,
            Err(CrmError::TooManyAttempts)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_wrong_guesses_respect_the_limit() {
        let limits = GatewayLimits {
            max_failed_unlocks: 3,
            ..GatewayLimits::default()
        };
        let f = fixture(limits).await;
        let code = f.shares.create_share(&f.ctx, &f.id, Some("abcd")).await.unwrap();
        let gateway = Arc::new(f.gateway);

        let handles: Vec<_> = (0..24)
            .map(|i| {
                let gateway = Arc::clone(&gateway);
                let code = code.clone();
                tokio::spawn(async move {
                    let guess = format!("guess{i}");
                    let mut session = ShareSession::default();
                    gateway.unlock(code.as_str(), &guess, &mut session).await
                })
            })
            .collect();

        let mut checked = 0;
        let mut throttled = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Err(CrmError::PasswordIncorrect) => checked += 1,
                Err(CrmError::TooManyAttempts) => throttled += 1,
                other => panic!("unexpected unlock outcome: {other:?}"),
            }
        }
        assert_eq!(checked, 3);
        assert_eq!(throttled, 21);
    }

    #[tokio::test]
    async fn test_unlock_reports_whether_session_changed() {
        let f = fixture(GatewayLimits::default()).await;
        let mut session = ShareSession::default();

        let open = f.shares.create_share(&f.ctx, &f.id, None).await.unwrap();
        assert!(!f.gateway.unlock(open.as_str(), "", &mut session).await.unwrap());
        assert!(session.is_empty());

        let locked = f.shares.regenerate_share(&f.ctx, &f.id, Some("abcd")).await.unwrap();
        assert!(f.gateway.unlock(locked.as_str(), "abcd", &mut session).await.unwrap());
        assert_eq!(session.len(), 1);
    }

    #[tokio::test]
    async fn test_completed_visits_only_and_bounded() {
        let limits = GatewayLimits {
            visit_limit: 2,
            ..GatewayLimits::default()
        };
        let f = fixture(limits).await;
        let code = f.shares.create_share(&f.ctx, &f.id, None).await.unwrap();
        for (days, status) in [
            (1, VisitStatus::Completed),
            (2, VisitStatus::Completed),
            (3, VisitStatus::Completed),
            (0, VisitStatus::Scheduled),
        ] {
            f.store.insert_visit(visit(&f, days, status)).await;
        }

        let visits = f
            .gateway
            .completed_visits(code.as_str(), &ShareSession::default())
            .await
            .unwrap();
        assert_eq!(visits.len(), 2);
        assert!(visits.iter().all(|v| v.status == VisitStatus::Completed));
    }

    #[tokio::test]
    async fn test_visit_by_id_is_scoped_to_customer() {
        let f = fixture(GatewayLimits::default()).await;
        let code = f.shares.create_share(&f.ctx, &f.id, None).await.unwrap();
        let own = visit(&f, 1, VisitStatus::Completed);
        let own_id = own.id;
        f.store.insert_visit(own).await;

        let mut sibling = visit(&f, 1, VisitStatus::Completed);
        sibling.customer_id = CustomerId::from_number(2).unwrap();
        let sibling_id = sibling.id;
        f.store.insert_visit(sibling).await;

        let session = ShareSession::default();
        let found = f
            .gateway
            .visit(code.as_str(), &own_id.to_string(), &session)
            .await
            .unwrap();
        assert_eq!(found.id, own_id);

        for raw in [sibling_id.to_string(), "not-a-uuid".to_owned()] {
            assert!(matches!(
                f.gateway.visit(code.as_str(), &raw, &session).await,
                Err(CrmError::ShareNotFound)
            ));
        }
    }

    #[tokio::test]
    async fn test_locked_visit_asks_for_password_before_parsing_id() {
        let f = fixture(GatewayLimits::default()).await;
        let code = f.shares.create_share(&f.ctx, &f.id, Some("abcd")).await.unwrap();

        assert!(matches!(
            f.gateway
                .visit(code.as_str(), "not-a-uuid", &ShareSession::default())
                .await,
            Err(CrmError::PasswordRequired)
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_retried() {
        let f = fixture(GatewayLimits::default()).await;
        let code = f.shares.create_share(&f.ctx, &f.id, None).await.unwrap();

        f.store.fail_next(1);
        assert!(matches!(
            f.gateway
                .resolve_by_token(code.as_str(), &ShareSession::default())
                .await,
            Err(CrmError::StoreUnavailable(_))
        ));
    }
}
