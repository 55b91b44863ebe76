//! Share capability management.
//!
//! A share is an opaque random token stored on one customer record, optionally
//! guarded by a password. Issuing a share always replaces the previous token
//! and password hash, so old links stop resolving as soon as the write lands.

mod code;
mod password;

pub use code::generate as generate_share_code;
pub use password::{hash_password, validate_password, verify_password};

use std::sync::Arc;

use chrono::Utc;
use salon_crm_core::{CustomerId, ShareCode};

use super::{CrmError, RetryPolicy, TenantContext};
use crate::db::{CustomerStore, ShareWrite, StoreError};
use crate::models::ShareStatus;

/// How many fresh tokens to try when one collides with an existing code.
const MAX_CODE_COLLISIONS: u32 = 3;

/// Creates, rotates and disables share tokens on customer records.
pub struct ShareManager<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: CustomerStore> ShareManager<S> {
    /// Create a new share manager.
    #[must_use]
    pub const fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Issue a share link for a customer.
    ///
    /// # Errors
    ///
    /// - `CrmError::InvalidInput` if the password fails validation
    /// - `CrmError::CustomerNotFound` if the customer does not exist
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn create_share(
        &self,
        ctx: &TenantContext,
        id: &CustomerId,
        password: Option<&str>,
    ) -> Result<ShareCode, CrmError> {
        let code = self.issue(ctx, id, password).await?;
        tracing::info!(
            tenant = %ctx.tenant_id(),
            customer = %id,
            password_protected = password.is_some(),
            "Share created"
        );
        Ok(code)
    }

    /// Replace a customer's share link with a new token.
    ///
    /// `password: None` clears any previously stored password.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_share`].
    pub async fn regenerate_share(
        &self,
        ctx: &TenantContext,
        id: &CustomerId,
        password: Option<&str>,
    ) -> Result<ShareCode, CrmError> {
        let code = self.issue(ctx, id, password).await?;
        tracing::info!(
            tenant = %ctx.tenant_id(),
            customer = %id,
            password_protected = password.is_some(),
            "Share regenerated"
        );
        Ok(code)
    }

    async fn issue(
        &self,
        ctx: &TenantContext,
        id: &CustomerId,
        password: Option<&str>,
    ) -> Result<ShareCode, CrmError> {
        let password_hash = match password {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let tenant = ctx.tenant_id();
        for _ in 0..MAX_CODE_COLLISIONS {
            let code = generate_share_code()?;
            let write = ShareWrite::Issue {
                code: code.clone(),
                password_hash: password_hash.clone(),
                issued_at: Utc::now(),
            };
            match self
                .retry
                .run("write_share", || self.store.write_share(tenant, id, &write))
                .await
            {
                Ok(()) => return Ok(code),
                Err(StoreError::Conflict(_)) => {
                    tracing::warn!(
                        tenant = %tenant,
                        customer = %id,
                        "Share code collision, regenerating"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(CrmError::StoreUnavailable("could not issue a unique share code".to_owned()))
    }

    /// Stop a customer's share link from resolving. The token is kept so the
    /// share can be re-enabled.
    ///
    /// # Errors
    ///
    /// - `CrmError::CustomerNotFound` if the customer does not exist
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn disable_share(
        &self,
        ctx: &TenantContext,
        id: &CustomerId,
    ) -> Result<(), CrmError> {
        let tenant = ctx.tenant_id();
        self.retry
            .run("write_share", || {
                self.store.write_share(tenant, id, &ShareWrite::Disable)
            })
            .await?;
        tracing::info!(tenant = %tenant, customer = %id, "Share disabled");
        Ok(())
    }

    /// Re-enable a disabled share with its existing token and password.
    ///
    /// # Errors
    ///
    /// - `CrmError::CustomerNotFound` if the customer does not exist or was
    ///   never shared
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn enable_share(&self, ctx: &TenantContext, id: &CustomerId) -> Result<(), CrmError> {
        let tenant = ctx.tenant_id();
        self.retry
            .run("write_share", || {
                self.store.write_share(tenant, id, &ShareWrite::Enable)
            })
            .await?;
        tracing::info!(tenant = %tenant, customer = %id, "Share enabled");
        Ok(())
    }

    /// Share state of a customer, without the password hash.
    ///
    /// Returns `None` if the customer was never shared.
    ///
    /// # Errors
    ///
    /// - `CrmError::CustomerNotFound` if the customer does not exist
    /// - `CrmError::StoreUnavailable` / `StoreDenied` on store failures
    pub async fn share_status(
        &self,
        ctx: &TenantContext,
        id: &CustomerId,
    ) -> Result<Option<ShareStatus>, CrmError> {
        let tenant = ctx.tenant_id();
        let customer = self
            .retry
            .run("get_customer", || self.store.get_customer(tenant, id))
            .await?
            .ok_or(CrmError::CustomerNotFound)?;
        Ok(customer.share.as_ref().map(ShareStatus::from))
    }

    /// Check `candidate` against the password of the share holding `code`.
    ///
    /// Returns `false` for an unknown or disabled code and for a share with
    /// no password, so the result says nothing about which case applied.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::StoreUnavailable` / `StoreDenied` on store failures.
    pub async fn verify_password(
        &self,
        code: &ShareCode,
        candidate: &str,
    ) -> Result<bool, CrmError> {
        let customer = self
            .retry
            .run("find_by_share_code", || self.store.find_by_share_code(code))
            .await?;

        Ok(customer
            .as_ref()
            .and_then(|c| c.share.as_ref())
            .filter(|s| s.enabled && s.code == *code)
            .and_then(|s| s.password_hash.as_ref())
            .is_some_and(|hash| verify_password(candidate, hash)))
    }
}
