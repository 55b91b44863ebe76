//! Share grant types and the views reachable through a share link.

use chrono::{DateTime, Utc};
use salon_crm_core::{DisplayName, Price, ShareCode, VisitId, VisitStatus};
use serde::Serialize;

use super::visit::Visit;

/// A PHC-format Argon2 hash of a share password.
///
/// Never serialized and redacted from `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SharePasswordHash(String);

impl SharePasswordHash {
    /// Wrap a PHC string produced by the hasher or read from the store.
    #[must_use]
    pub const fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    /// The PHC string, for persistence and verification.
    #[must_use]
    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SharePasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharePasswordHash([REDACTED])")
    }
}

/// The share fields stored on a customer record.
#[derive(Debug, Clone)]
pub struct ShareGrant {
    /// Current token. Retained while disabled so the share can be re-enabled.
    pub code: ShareCode,
    /// Whether the token currently resolves.
    pub enabled: bool,
    /// One-way hash of the share password, if one is set.
    pub password_hash: Option<SharePasswordHash>,
    /// When the current token was issued.
    pub issued_at: DateTime<Utc>,
}

impl ShareGrant {
    /// Whether a password must be verified before anything is shown.
    #[must_use]
    pub const fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// What the owning tenant sees about a customer's share.
#[derive(Debug, Clone, Serialize)]
pub struct ShareStatus {
    /// Current token, for building the link.
    pub code: ShareCode,
    /// Whether the link currently resolves.
    pub enabled: bool,
    /// Whether the link asks for a password.
    pub password_protected: bool,
    /// When the current token was issued.
    pub issued_at: DateTime<Utc>,
}

impl From<&ShareGrant> for ShareStatus {
    fn from(grant: &ShareGrant) -> Self {
        Self {
            code: grant.code.clone(),
            enabled: grant.enabled,
            password_protected: grant.is_password_protected(),
            issued_at: grant.issued_at,
        }
    }
}

/// The customer as seen through a share link.
///
/// Carries no tenant identity and no customer identifier.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerShareView {
    /// Masked display name.
    pub display_name: DisplayName,
    /// When the link was issued.
    pub shared_since: DateTime<Utc>,
}

/// A visit as seen through a share link.
#[derive(Debug, Clone, Serialize)]
pub struct VisitView {
    pub id: VisitId,
    pub visited_at: DateTime<Utc>,
    pub menu: String,
    pub price: Option<Price>,
    pub status: VisitStatus,
    pub note: Option<String>,
}

impl From<Visit> for VisitView {
    fn from(visit: Visit) -> Self {
        Self {
            id: visit.id,
            visited_at: visit.visited_at,
            menu: visit.menu,
            price: visit.price,
            status: visit.status,
            note: visit.note,
        }
    }
}
