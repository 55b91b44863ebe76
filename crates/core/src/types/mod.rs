//! Core types for the salon CRM.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod share_code;
pub mod status;

pub use id::{CustomerId, IdError, TenantId, VisitId};
pub use price::{CurrencyCode, Price};
pub use share_code::{ShareCode, ShareCodeError};
pub use status::VisitStatus;
