//! Explicit tenant context.

use salon_crm_core::TenantId;

use super::CrmError;

/// The authenticated tenant a call acts on behalf of.
///
/// Produced by the caller's authentication layer and passed into every
/// tenant-scoped operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    /// Wrap an already-authenticated tenant.
    #[must_use]
    pub const fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    /// Build a context from the identity the auth layer resolved, if any.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::NotAuthenticated` if no identity was resolved or
    /// it is not a valid tenant identifier.
    pub fn from_identity(identity: Option<&str>) -> Result<Self, CrmError> {
        let raw = identity.ok_or(CrmError::NotAuthenticated)?;
        let tenant_id = TenantId::parse(raw).map_err(|_| CrmError::NotAuthenticated)?;
        Ok(Self { tenant_id })
    }

    /// The tenant this context acts for.
    #[must_use]
    pub const fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_identity() {
        let ctx = TenantContext::from_identity(Some("salon-a")).unwrap();
        assert_eq!(ctx.tenant_id().as_str(), "salon-a");
    }

    #[test]
    fn test_missing_identity_is_not_authenticated() {
        assert!(matches!(
            TenantContext::from_identity(None),
            Err(CrmError::NotAuthenticated)
        ));
        assert!(matches!(
            TenantContext::from_identity(Some("  ")),
            Err(CrmError::NotAuthenticated)
        ));
    }
}
