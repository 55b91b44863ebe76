//! Visit domain types.

use chrono::{DateTime, Utc};
use salon_crm_core::{CustomerId, Price, TenantId, VisitId, VisitStatus};

/// A visit (reservation) belonging to one customer.
///
/// Visits are written by the reservation screens; this subsystem only reads
/// them back through a share link.
#[derive(Debug, Clone)]
pub struct Visit {
    /// Random visit identifier.
    pub id: VisitId,
    /// Tenant that owns the customer.
    pub tenant_id: TenantId,
    /// Customer the visit belongs to.
    pub customer_id: CustomerId,
    /// When the visit took (or takes) place.
    pub visited_at: DateTime<Utc>,
    /// Service menu booked (e.g. "Cut & Color").
    pub menu: String,
    /// Amount charged, if recorded.
    pub price: Option<Price>,
    /// Lifecycle state.
    pub status: VisitStatus,
    /// Note written for the customer.
    pub note: Option<String>,
}
