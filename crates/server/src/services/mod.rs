//! Business logic services.
//!
//! # Services
//!
//! - [`CustomerService`] - Tenant-side create/read/update/delete with write-time masking
//! - [`IdentifierAllocator`] - Per-tenant customer numbering by conditional insert
//! - [`ShareManager`] - Issue, rotate, disable and verify share links
//! - [`ShareGateway`] - Anonymous reads through a share link
//!
//! Tenant-scoped operations take an explicit [`TenantContext`]; nothing reads
//! the tenant from ambient state.

pub mod allocator;
mod context;
pub mod customers;
mod error;
pub mod gateway;
mod retry;
pub mod share;

pub use allocator::{IdentifierAllocator, next_customer_id};
pub use context::TenantContext;
pub use customers::CustomerService;
pub use error::CrmError;
pub use gateway::{GatewayLimits, ShareGateway};
pub use retry::RetryPolicy;
pub use share::ShareManager;
