//! Customer domain types.

use chrono::{DateTime, Utc};
use salon_crm_core::{CustomerId, DisplayName, PhoneTail, TenantId};

use super::share::ShareGrant;

/// A tenant-scoped customer record, as persisted.
///
/// `name` and `phone` hold the reduced forms; the plaintext never reaches
/// this type except on the owner record (`0000`).
#[derive(Debug, Clone)]
pub struct Customer {
    /// Tenant that owns this customer.
    pub tenant_id: TenantId,
    /// Identifier, unique within the tenant.
    pub id: CustomerId,
    /// Masked display name.
    pub name: DisplayName,
    /// Last digits of the phone number.
    pub phone: PhoneTail,
    /// Free-form tenant notes.
    pub memo: Option<String>,
    /// When the customer was created.
    pub created_at: DateTime<Utc>,
    /// When the customer was last updated.
    pub updated_at: DateTime<Utc>,
    /// Current share grant, if the customer was ever shared.
    pub share: Option<ShareGrant>,
}

/// Plaintext fields supplied when creating a customer.
///
/// `Debug` is redacted so plaintext never ends up in logs.
#[derive(Clone, Default)]
pub struct NewCustomer {
    /// Full name as typed by the tenant.
    pub name: String,
    /// Phone number as typed by the tenant.
    pub phone: String,
    /// Free-form tenant notes.
    pub memo: Option<String>,
}

impl std::fmt::Debug for NewCustomer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewCustomer")
            .field("name", &"[REDACTED]")
            .field("phone", &"[REDACTED]")
            .field("memo", &self.memo.as_ref().map(|_| "[..]"))
            .finish()
    }
}

/// Partial edit of a customer. `None` leaves a field untouched.
///
/// `memo: Some(None)` clears the memo.
#[derive(Clone, Default)]
pub struct CustomerUpdate {
    /// New plaintext name.
    pub name: Option<String>,
    /// New plaintext phone number.
    pub phone: Option<String>,
    /// New memo, or `Some(None)` to clear it.
    pub memo: Option<Option<String>>,
}

impl CustomerUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.memo.is_none()
    }
}

impl std::fmt::Debug for CustomerUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerUpdate")
            .field("name", &self.name.as_ref().map(|_| "[REDACTED]"))
            .field("phone", &self.phone.as_ref().map(|_| "[REDACTED]"))
            .field("memo", &self.memo.as_ref().map(|_| "[..]"))
            .finish()
    }
}
